use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    indicator::debug_assert_advancing, wilder::Wilder,
};

/// Configuration for the Relative Strength Index ([`Rsi`])
/// indicator.
///
/// RSI uses Wilder's smoothing, which has infinite memory: the
/// SMA seed (first `length` price changes) influences all
/// subsequent values. Output begins at bar `length + 1`.
///
/// # Example
///
/// ```
/// use barlens_ta::{IndicatorConfig, RsiConfig};
/// use std::num::NonZero;
///
/// let config = RsiConfig::close(NonZero::new(14).unwrap());
/// assert_eq!(config.length(), 14);
/// assert_eq!(config.required_bars(), 15);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct RsiConfig {
    length: usize,
    source: PriceSource,
}

impl IndicatorConfig for RsiConfig {
    type Builder = RsiConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        RsiConfigBuilder::new()
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length + 1
    }
}

impl RsiConfig {
    /// RSI on closing price.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl Display for RsiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RsiConfig({}, {})", self.length, self.source)
    }
}

/// Builder for [`RsiConfig`].
///
/// Defaults: source = [`PriceSource::Close`].
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct RsiConfigBuilder {
    length: Option<usize>,
    source: PriceSource,
}

impl RsiConfigBuilder {
    #[must_use]
    fn new() -> Self {
        Self {
            length: None,
            source: PriceSource::Close,
        }
    }

    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }

    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

impl IndicatorConfigBuilder<RsiConfig> for RsiConfigBuilder {
    #[inline]
    fn build(self) -> RsiConfig {
        let length = self.length.expect("length is required");

        RsiConfig {
            length,
            source: self.source,
        }
    }
}

/// Relative Strength Index (RSI) with Wilder's smoothing.
///
/// Measures the speed and magnitude of recent price changes on
/// a 0–100 scale. Values above 70 are conventionally considered
/// overbought; below 30, oversold.
///
/// The first `length` price changes are averaged with a simple
/// mean (SMA seed). After seeding, gains and losses are smoothed
/// with Wilder's method (`α = 1 / length`):
///
/// ```text
/// avg_gain = (prev_avg_gain × (length − 1) + gain) / length
/// avg_loss = (prev_avg_loss × (length − 1) + loss) / length
/// RSI      = 100 − 100 / (1 + avg_gain / avg_loss)
/// ```
///
/// When `avg_loss` is zero the RSI is 100, including a completely
/// flat series.
///
/// # Example
///
/// ```
/// use barlens_ta::{Rsi, RsiConfig, Sample};
/// use std::num::NonZero;
///
/// let mut rsi = Rsi::new(RsiConfig::close(NonZero::new(3).unwrap()));
///
/// // Seeding: need 3 price changes (4 bars)
/// assert_eq!(rsi.compute(&Sample::new(1, 10.0)), None);
/// assert_eq!(rsi.compute(&Sample::new(2, 12.0)), None);
/// assert_eq!(rsi.compute(&Sample::new(3, 11.0)), None);
///
/// // Bar 4: changes = +2, −1, +2 → avg_gain=4/3, avg_loss=1/3 → RSI=80
/// let value = rsi.compute(&Sample::new(4, 13.0)).unwrap();
/// assert!((value - 80.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct Rsi {
    config: RsiConfig,
    prev_price: Option<Price>,
    prev_close: Option<Price>,
    gains: Wilder,
    losses: Wilder,
    current: Option<Price>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Rsi {
    type Config = RsiConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            prev_price: None,
            prev_close: None,
            gains: Wilder::new(config.length),
            losses: Wilder::new(config.length),
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<Self::Output> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let price = self.config.source.extract(ohlcv, self.prev_close);
        self.prev_close = Some(ohlcv.close());

        // First bar only records the reference price.
        if let Some(prev_price) = self.prev_price.replace(price) {
            let (gain, loss) = Self::gain_and_loss(prev_price, price);
            let avg_gain = self.gains.push(gain);
            let avg_loss = self.losses.push(loss);

            self.current = avg_gain
                .zip(avg_loss)
                .map(|(avg_gain, avg_loss)| Self::rsi_from_averages(avg_gain, avg_loss));
        }

        self.current
    }

    #[inline]
    fn value(&self) -> Option<Self::Output> {
        self.current
    }
}

impl Rsi {
    #[inline]
    fn gain_and_loss(prev: Price, current: Price) -> (f64, f64) {
        let change = current - prev;
        (change.max(0.0), (-change).max(0.0))
    }

    #[inline]
    fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Price {
        if avg_loss == 0.0 {
            return 100.0;
        }

        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

impl Display for Rsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RSI({}, {})", self.config.length, self.config.source)
    }
}
