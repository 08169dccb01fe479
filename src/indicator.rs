use crate::{Ohlcv, Timestamp};

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

/// Configuration for a technical [`Indicator`].
///
/// Every indicator has a corresponding config type that holds its parameters
/// (lengths, price source, etc). Configs are value types: cheap to clone,
/// compare, and hash.
pub trait IndicatorConfig: Sized + PartialEq + Eq + Hash + Display + Debug {
    /// Builder type for constructing this config.
    type Builder: IndicatorConfigBuilder<Self>;

    /// Returns a new builder with default values.
    fn builder() -> Self::Builder;

    /// Number of bars consumed before the first value is produced.
    ///
    /// The first `Some` output appears at bar index `required_bars() - 1`.
    fn required_bars(&self) -> usize;
}

/// Builder for an [`IndicatorConfig`].
pub trait IndicatorConfigBuilder<Config>
where
    Config: IndicatorConfig,
{
    /// Builds the config. Panics if required fields are missing.
    #[must_use]
    fn build(self) -> Config;
}

/// A streaming technical indicator.
///
/// `new` creates an empty state. The first call to
/// [`compute`](Indicator::compute) seeds it from the first bar, every later
/// call advances it by exactly one bar. Output is `None` while the indicator
/// does not have enough history; `None` never stands in for zero.
///
/// Indicators are plain values. Cloning one snapshots its state, and the
/// clone evolves independently.
///
/// # Example
///
/// ```
/// use barlens_ta::{Indicator, IndicatorConfig, Sample, Sma, SmaConfig};
/// use std::num::NonZero;
///
/// let mut sma = Sma::new(SmaConfig::close(NonZero::new(3).unwrap()));
///
/// assert!(sma.compute(&Sample::new(1, 10.0)).is_none());
/// assert!(sma.compute(&Sample::new(2, 20.0)).is_none());
/// assert_eq!(sma.compute(&Sample::new(3, 30.0)).unwrap().average(), 20.0);
/// ```
pub trait Indicator: Sized + Clone + Display + Debug {
    /// Configuration type for this indicator.
    type Config: IndicatorConfig;

    /// Computed output type. `f64` for simple indicators,
    /// a struct for composite ones (e.g. Bollinger Bands).
    type Output: Send + Sync + Display + Debug;

    /// Creates a new indicator from the given config.
    fn new(config: Self::Config) -> Self;

    /// Feeds the next bar and returns the updated indicator value,
    /// or `None` if not enough bars have been seen.
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<Self::Output>;

    /// Returns the last computed indicator value without advancing state.
    ///
    /// This is a cached field read, O(1) with no computation.
    fn value(&self) -> Option<Self::Output>;
}

/// Debug-build guard for the one-bar-per-call contract.
#[inline]
pub(crate) fn debug_assert_advancing(last: Option<Timestamp>, next: Timestamp) {
    debug_assert!(
        last.is_none_or(|t| t < next),
        "open_time must be strictly increasing: last={}, got={next}",
        last.unwrap_or(0),
    );
}
