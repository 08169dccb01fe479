use std::{
    fmt::{Debug, Display},
    num::NonZero,
};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    price_window::PriceWindow,
};

/// Configuration for the Simple Moving Average ([`Sma`]) indicator.
///
/// # Example
///
/// ```rust
/// use barlens_ta::{IndicatorConfig, SmaConfig};
/// use std::num::NonZero;
///
/// let config = SmaConfig::close(NonZero::new(20).unwrap());
/// assert_eq!(config.length(), 20);
/// assert_eq!(config.required_bars(), 20);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SmaConfig {
    length: usize,
    source: PriceSource,
}

impl IndicatorConfig for SmaConfig {
    type Builder = SmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        SmaConfigBuilder::new()
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length
    }
}

impl SmaConfig {
    /// SMA on closing price.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    /// SMA on traded volume.
    #[must_use]
    pub fn volume(length: NonZero<usize>) -> Self {
        Self::builder()
            .length(length)
            .source(PriceSource::Volume)
            .build()
    }

    /// SMA on median price: `(high + low) / 2`.
    #[must_use]
    pub fn hl2(length: NonZero<usize>) -> Self {
        Self::builder()
            .length(length)
            .source(PriceSource::HL2)
            .build()
    }

    /// Window length (number of bars).
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Price source extracted from each bar.
    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl Display for SmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SmaConfig({}, {})", self.length, self.source)
    }
}

/// Builder for [`SmaConfig`].
///
/// Defaults: source = [`PriceSource::Close`].
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct SmaConfigBuilder {
    length: Option<usize>,
    source: PriceSource,
}

impl SmaConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            source: PriceSource::Close,
        }
    }

    /// Sets the window length.
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    /// Sets the price source.
    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

impl IndicatorConfigBuilder<SmaConfig> for SmaConfigBuilder {
    #[inline]
    fn build(self) -> SmaConfig {
        SmaConfig {
            length: self.length.expect("length is required"),
            source: self.source,
        }
    }
}

/// SMA output: the average plus the sample the window drops next.
///
/// Traders call the exclusion the "deduction": comparing the incoming price
/// with `exclusion` tells whether the next bar can lift or drag the average.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SmaValue {
    average: Price,
    exclusion: Price,
    exclusion_time: Timestamp,
}

impl SmaValue {
    /// Mean of the window.
    #[inline]
    #[must_use]
    pub fn average(&self) -> Price {
        self.average
    }

    /// Oldest sample in the window, evicted by the next bar.
    #[inline]
    #[must_use]
    pub fn exclusion(&self) -> Price {
        self.exclusion
    }

    /// `open_time` of the bar that produced [`exclusion`](Self::exclusion).
    #[inline]
    #[must_use]
    pub fn exclusion_time(&self) -> Timestamp {
        self.exclusion_time
    }
}

impl Display for SmaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SMA(avg: {}, excl: {} @ {})",
            self.average, self.exclusion, self.exclusion_time
        )
    }
}

/// Simple Moving Average (SMA).
///
/// Computes the unweighted mean of the last *n* values, where *n* is the
/// configured window length. Returns `None` until the window is full.
///
/// Uses a running sum for O(1) updates per bar.
///
/// # Example
///
/// ```rust
/// use barlens_ta::{Sma, SmaConfig, Sample};
/// use std::num::NonZero;
///
/// let mut sma = Sma::new(SmaConfig::close(NonZero::new(3).unwrap()));
///
/// assert_eq!(sma.compute(&Sample::new(1, 10.0)), None);
/// assert_eq!(sma.compute(&Sample::new(2, 20.0)), None);
///
/// let value = sma.compute(&Sample::new(3, 30.0)).unwrap();
/// assert_eq!(value.average(), 20.0);
/// assert_eq!(value.exclusion(), 10.0);
/// assert_eq!(value.exclusion_time(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Sma {
    config: SmaConfig,
    window: PriceWindow,
    length_reciprocal: f64,
    current: Option<SmaValue>,
}

impl Indicator for Sma {
    type Config = SmaConfig;
    type Output = SmaValue;

    fn new(config: Self::Config) -> Self {
        let window = PriceWindow::new(config.length, config.source);

        Self {
            config,
            window,
            #[allow(clippy::cast_precision_loss)]
            length_reciprocal: 1.0 / config.length as f64,
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<SmaValue> {
        self.window.add(ohlcv);

        self.current = match (self.window.sum(), self.window.oldest()) {
            (Some(sum), Some((exclusion_time, exclusion))) => Some(SmaValue {
                average: sum * self.length_reciprocal,
                exclusion,
                exclusion_time,
            }),
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<SmaValue> {
        self.current
    }
}

impl Display for Sma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMA({}, {})", self.config.length, self.config.source)
    }
}
