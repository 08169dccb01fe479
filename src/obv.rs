use std::fmt::Display;

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    indicator::debug_assert_advancing,
};

/// Configuration for On-Balance Volume ([`Obv`]).
///
/// OBV has no window. The only parameter is the price compared bar to bar
/// to decide the direction, close by default.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub struct ObvConfig {
    source: PriceSource,
}

impl IndicatorConfig for ObvConfig {
    type Builder = ObvConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        ObvConfigBuilder {
            source: PriceSource::Close,
        }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        1
    }
}

impl ObvConfig {
    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl Display for ObvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObvConfig({})", self.source)
    }
}

/// Builder for [`ObvConfig`]. Defaults to [`PriceSource::Close`].
pub struct ObvConfigBuilder {
    source: PriceSource,
}

impl ObvConfigBuilder {
    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

impl IndicatorConfigBuilder<ObvConfig> for ObvConfigBuilder {
    #[inline]
    fn build(self) -> ObvConfig {
        ObvConfig {
            source: self.source,
        }
    }
}

/// On-Balance Volume (OBV).
///
/// A running total of volume signed by price direction. The first bar seeds
/// the total with its own volume; after that
///
/// ```text
/// close > prev_close → obv += volume
/// close < prev_close → obv −= volume
/// otherwise          → unchanged
/// ```
///
/// # Example
///
/// ```
/// use barlens_ta::{Bar, Obv, ObvConfig};
///
/// let mut obv = Obv::new(ObvConfig::default());
///
/// let closes = [10.0, 11.0, 10.0, 10.0, 12.0];
/// let volumes = [100.0, 200.0, 150.0, 150.0, 300.0];
/// let expected = [100.0, 300.0, 150.0, 150.0, 450.0];
///
/// for (i, (c, v)) in closes.into_iter().zip(volumes).enumerate() {
///     let bar = Bar::new(i as u64, c, c, c, c, v);
///     assert_eq!(obv.compute(&bar), Some(expected[i]));
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Obv {
    config: ObvConfig,
    obv: Option<f64>,
    prev_price: Price,
    prev_close: Option<Price>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Obv {
    type Config = ObvConfig;
    type Output = f64;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            obv: None,
            prev_price: 0.0,
            prev_close: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<f64> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let price = self.config.source.extract(ohlcv, self.prev_close);
        self.prev_close = Some(ohlcv.close());

        let volume = ohlcv.volume();
        self.obv = Some(match self.obv {
            None => volume,
            Some(obv) if price > self.prev_price => obv + volume,
            Some(obv) if price < self.prev_price => obv - volume,
            Some(obv) => obv,
        });
        self.prev_price = price;

        self.obv
    }

    #[inline]
    fn value(&self) -> Option<f64> {
        self.obv
    }
}

impl Display for Obv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OBV({})", self.config.source)
    }
}
