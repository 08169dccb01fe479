use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    num::NonZero,
};

use serde::Serialize;

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    price_window::{PriceWindow, PriceWindowWithSumOfSquares},
};

/// Band offset in standard deviations. Positive and finite, `2.0` by default.
///
/// Compared and hashed by bit pattern, which is sound because NaN never gets
/// in.
#[derive(Clone, Copy, Debug)]
pub struct StdDev(f64);

impl StdDev {
    /// # Panics
    ///
    /// When `value` is NaN, infinite, zero or negative.
    #[must_use]
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "std_dev must be finite");
        assert!(value > 0.0, "std_dev must be positive");
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for StdDev {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for StdDev {}

impl Hash for StdDev {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Default for StdDev {
    fn default() -> Self {
        Self(2.0)
    }
}

/// Configuration for Bollinger Bands ([`Bb`]).
///
/// ```
/// use barlens_ta::{BbConfig, IndicatorConfig, IndicatorConfigBuilder, PriceSource, StdDev};
/// use std::num::NonZero;
///
/// let config = BbConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .std_dev(StdDev::new(2.5))
///     .build();
///
/// assert_eq!(config.required_bars(), 20);
/// assert_eq!(config.source(), PriceSource::Close);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BbConfig {
    length: usize,
    source: PriceSource,
    std_dev: StdDev,
}

impl IndicatorConfig for BbConfig {
    type Builder = BbConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        BbConfigBuilder {
            length: None,
            source: PriceSource::Close,
            std_dev: StdDev::default(),
        }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length
    }
}

impl BbConfig {
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

    #[inline]
    #[must_use]
    pub fn std_dev(&self) -> StdDev {
        self.std_dev
    }

    /// Bands on the close, two standard deviations wide.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for BbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BbConfig({}, {}, {})",
            self.length, self.source, self.std_dev.0
        )
    }
}

/// Builder for [`BbConfig`]. Source defaults to close, width to `2.0`.
pub struct BbConfigBuilder {
    length: Option<usize>,
    source: PriceSource,
    std_dev: StdDev,
}

impl BbConfigBuilder {
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

    #[inline]
    #[must_use]
    pub fn std_dev(mut self, std_dev: StdDev) -> Self {
        self.std_dev = std_dev;
        self
    }
}

impl IndicatorConfigBuilder<BbConfig> for BbConfigBuilder {
    #[inline]
    fn build(self) -> BbConfig {
        BbConfig {
            length: self.length.expect("length is required"),
            source: self.source,
            std_dev: self.std_dev,
        }
    }
}

/// One Bollinger reading.
///
/// ```text
/// middle = mean of the window
/// upper  = middle + k × σ
/// lower  = middle − k × σ
/// ```
///
/// `σ` is the population deviation of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BbValue {
    upper: Price,
    middle: Price,
    lower: Price,
    exclusion_time: Timestamp,
}

impl BbValue {
    #[inline]
    #[must_use]
    pub fn upper(&self) -> Price {
        self.upper
    }

    #[inline]
    #[must_use]
    pub fn middle(&self) -> Price {
        self.middle
    }

    #[inline]
    #[must_use]
    pub fn lower(&self) -> Price {
        self.lower
    }

    /// `open_time` of the oldest bar in the window, the one the next bar
    /// pushes out.
    #[inline]
    #[must_use]
    pub fn exclusion_time(&self) -> Timestamp {
        self.exclusion_time
    }

    /// Absolute spread `upper − lower`.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Spread relative to the middle band. A falling value is a squeeze.
    ///
    /// `None` when the middle band is zero.
    #[inline]
    #[must_use]
    pub fn band_width(&self) -> Option<f64> {
        (self.middle != 0.0).then(|| self.width() / self.middle)
    }
}

impl Display for BbValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BB({} / {} / {})",
            self.upper, self.middle, self.lower
        )
    }
}

/// Bollinger Bands.
///
/// Keeps a running sum and sum of squares of the window, so an update costs
/// one square root regardless of length. `None` until the window is full.
///
/// ```
/// use barlens_ta::{Bb, BbConfig, Sample};
/// use std::num::NonZero;
///
/// let mut bb = Bb::new(BbConfig::close(NonZero::new(2).unwrap()));
///
/// assert_eq!(bb.compute(&Sample::new(1, 9.0)), None);
///
/// let value = bb.compute(&Sample::new(2, 11.0)).unwrap();
/// assert_eq!(value.middle(), 10.0);
/// assert_eq!((value.upper(), value.lower()), (12.0, 8.0));
/// assert_eq!(value.exclusion_time(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Bb {
    config: BbConfig,
    length_reciprocal: f64,
    window: PriceWindowWithSumOfSquares,
    current: Option<BbValue>,
}

impl Indicator for Bb {
    type Config = BbConfig;
    type Output = BbValue;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            #[allow(clippy::cast_precision_loss)]
            length_reciprocal: 1.0 / config.length as f64,
            window: PriceWindow::with_sum_of_squares(config.length, config.source),
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<BbValue> {
        self.window.add(ohlcv);

        let (Some(sum), Some(sum_of_squares), Some((exclusion_time, _))) = (
            self.window.sum(),
            self.window.sum_of_squares(),
            self.window.oldest(),
        ) else {
            return None;
        };

        let middle = sum * self.length_reciprocal;
        // E[X²] − E[X]², clamped since rounding can push it just below zero
        let variance = sum_of_squares.mul_add(self.length_reciprocal, -(middle * middle));
        let offset = variance.max(0.0).sqrt() * self.config.std_dev.0;

        self.current = Some(BbValue {
            upper: middle + offset,
            middle,
            lower: middle - offset,
            exclusion_time,
        });
        self.current
    }

    #[inline]
    fn value(&self) -> Option<BbValue> {
        self.current
    }
}

impl Display for Bb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BB({}, {}, {})",
            self.config.length, self.config.source, self.config.std_dev.0
        )
    }
}
