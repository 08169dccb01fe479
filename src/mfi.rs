use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    indicator::debug_assert_advancing, ring_buffer::RollingSum,
};

/// Configuration for the Money Flow Index ([`Mfi`]).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct MfiConfig {
    length: usize,
}

impl IndicatorConfig for MfiConfig {
    type Builder = MfiConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        MfiConfigBuilder { length: None }
    }

    /// One extra bar for the first typical-price change.
    #[inline]
    fn required_bars(&self) -> usize {
        self.length + 1
    }
}

impl MfiConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Display for MfiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MfiConfig({})", self.length)
    }
}

pub struct MfiConfigBuilder {
    length: Option<usize>,
}

impl MfiConfigBuilder {
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }
}

impl IndicatorConfigBuilder<MfiConfig> for MfiConfigBuilder {
    #[inline]
    fn build(self) -> MfiConfig {
        MfiConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// Money Flow Index (MFI): a volume-weighted RSI.
///
/// ```text
/// tp   = (high + low + close) / 3
/// flow = tp × volume, positive when tp rose, negative when it fell
/// MFI  = 100 − 100 / (1 + Σ positive / Σ negative)
/// ```
///
/// Sums run over the last `length` typical-price changes. With no negative
/// flow in the window the MFI is 100.
///
/// # Example
///
/// ```
/// use barlens_ta::{Bar, Mfi, MfiConfig};
/// use std::num::NonZero;
///
/// let mut mfi = Mfi::new(MfiConfig::new(NonZero::new(2).unwrap()));
///
/// assert_eq!(mfi.compute(&Bar::new(1, 10.0, 10.0, 10.0, 10.0, 100.0)), None);
/// assert_eq!(mfi.compute(&Bar::new(2, 11.0, 11.0, 11.0, 11.0, 100.0)), None);
/// // Both changes up: no negative flow
/// assert_eq!(mfi.compute(&Bar::new(3, 12.0, 12.0, 12.0, 12.0, 100.0)), Some(100.0));
/// ```
#[derive(Clone, Debug)]
pub struct Mfi {
    config: MfiConfig,
    prev_typical: Option<Price>,
    positive: RollingSum,
    negative: RollingSum,
    current: Option<f64>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Mfi {
    type Config = MfiConfig;
    type Output = f64;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            prev_typical: None,
            positive: RollingSum::new(config.length),
            negative: RollingSum::new(config.length),
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<f64> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let typical = PriceSource::HLC3.extract(ohlcv, None);
        let Some(prev_typical) = self.prev_typical.replace(typical) else {
            return None;
        };

        let flow = typical * ohlcv.volume();
        let (positive, negative) = if typical > prev_typical {
            (flow, 0.0)
        } else if typical < prev_typical {
            (0.0, flow)
        } else {
            (0.0, 0.0)
        };
        self.positive.push(positive);
        self.negative.push(negative);

        self.current = match (self.positive.sum(), self.negative.sum()) {
            (Some(_), Some(negative)) if negative == 0.0 => Some(100.0),
            (Some(positive), Some(negative)) => Some(100.0 - 100.0 / (1.0 + positive / negative)),
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<f64> {
        self.current
    }
}

impl Display for Mfi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MFI({})", self.config.length)
    }
}
