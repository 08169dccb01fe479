use std::{
    fmt::{Debug, Display},
    num::NonZero,
};

use serde::Serialize;

use crate::{
    Ema, EmaConfig, Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, PriceSource,
    Sample,
};

const DEFAULT_FAST: NonZero<usize> = NonZero::new(12).unwrap();
const DEFAULT_SLOW: NonZero<usize> = NonZero::new(26).unwrap();
const DEFAULT_SIGNAL: NonZero<usize> = NonZero::new(9).unwrap();

/// Configuration for the Moving Average Convergence Divergence ([`Macd`])
/// indicator.
///
/// # Example
///
/// ```
/// use barlens_ta::{IndicatorConfig, MacdConfig};
///
/// let config = MacdConfig::default();
/// assert_eq!(config.fast_length(), 12);
/// assert_eq!(config.slow_length(), 26);
/// assert_eq!(config.signal_length(), 9);
/// assert_eq!(config.required_bars(), 1);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct MacdConfig {
    fast: NonZero<usize>,
    slow: NonZero<usize>,
    signal: NonZero<usize>,
    source: PriceSource,
}

impl IndicatorConfig for MacdConfig {
    type Builder = MacdConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        MacdConfigBuilder::new()
    }

    /// The EMAs are seeded from the first bar, so MACD has a value from the
    /// first bar on.
    #[inline]
    fn required_bars(&self) -> usize {
        1
    }
}

impl MacdConfig {
    /// Fast EMA length.
    #[inline]
    #[must_use]
    pub fn fast_length(&self) -> usize {
        self.fast.get()
    }

    /// Slow EMA length.
    #[inline]
    #[must_use]
    pub fn slow_length(&self) -> usize {
        self.slow.get()
    }

    /// Signal (DEM) EMA length.
    #[inline]
    #[must_use]
    pub fn signal_length(&self) -> usize {
        self.signal.get()
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl Default for MacdConfig {
    /// MACD(12, 26, 9) on close.
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
            source: PriceSource::Close,
        }
    }
}

impl Display for MacdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MacdConfig({}, {}, {}, {})",
            self.fast, self.slow, self.signal, self.source
        )
    }
}

/// Builder for [`MacdConfig`].
///
/// Defaults: 12 / 26 / 9 on [`PriceSource::Close`].
pub struct MacdConfigBuilder {
    config: MacdConfig,
}

impl MacdConfigBuilder {
    fn new() -> Self {
        Self {
            config: MacdConfig::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn fast_length(mut self, length: NonZero<usize>) -> Self {
        self.config.fast = length;
        self
    }

    #[inline]
    #[must_use]
    pub fn slow_length(mut self, length: NonZero<usize>) -> Self {
        self.config.slow = length;
        self
    }

    #[inline]
    #[must_use]
    pub fn signal_length(mut self, length: NonZero<usize>) -> Self {
        self.config.signal = length;
        self
    }

    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.config.source = source;
        self
    }
}

impl IndicatorConfigBuilder<MacdConfig> for MacdConfigBuilder {
    #[inline]
    fn build(self) -> MacdConfig {
        self.config
    }
}

/// MACD output.
///
/// ```text
/// dif = EMA(fast) − EMA(slow)
/// dem = EMA(signal) of dif
/// osc = dif − dem
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValue {
    dif: f64,
    dem: f64,
    osc: f64,
}

impl MacdValue {
    /// Spread between the fast and slow EMAs.
    #[inline]
    #[must_use]
    pub fn dif(&self) -> f64 {
        self.dif
    }

    /// Signal line: EMA of `dif`.
    #[inline]
    #[must_use]
    pub fn dem(&self) -> f64 {
        self.dem
    }

    /// Histogram: `dif − dem`.
    #[inline]
    #[must_use]
    pub fn osc(&self) -> f64 {
        self.osc
    }
}

impl Display for MacdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MACD(dif: {}, dem: {}, osc: {})",
            self.dif, self.dem, self.osc
        )
    }
}

/// Moving Average Convergence Divergence.
///
/// Three [`Ema`]s: fast and slow over price, and a signal EMA over their
/// spread. All three are seeded from the first bar, so early values are
/// directional approximations rather than missing.
///
/// # Example
///
/// ```
/// use barlens_ta::{Macd, MacdConfig, Sample};
///
/// let mut macd = Macd::new(MacdConfig::default());
///
/// // Both EMAs start at the first price
/// let first = macd.compute(&Sample::new(1, 10.0)).unwrap();
/// assert_eq!(first.dif(), 0.0);
///
/// // Rising price pulls the fast EMA above the slow one
/// let second = macd.compute(&Sample::new(2, 11.0)).unwrap();
/// assert!(second.dif() > 0.0);
/// assert!(second.osc() > 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Macd {
    config: MacdConfig,
    fast: Ema,
    slow: Ema,
    signal: Ema,
    current: Option<MacdValue>,
}

impl Indicator for Macd {
    type Config = MacdConfig;
    type Output = MacdValue;

    fn new(config: Self::Config) -> Self {
        let ema = |length: NonZero<usize>, source: PriceSource| {
            Ema::new(EmaConfig::builder().length(length).source(source).build())
        };

        Self {
            config,
            fast: ema(config.fast, config.source),
            slow: ema(config.slow, config.source),
            signal: ema(config.signal, PriceSource::Close),
            current: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<MacdValue> {
        let fast = self.fast.compute(ohlcv);
        let slow = self.slow.compute(ohlcv);

        self.current = match (fast, slow) {
            (Some(fast), Some(slow)) => {
                let dif = fast - slow;
                self.signal
                    .compute(&Sample::new(ohlcv.open_time(), dif))
                    .map(|dem| MacdValue {
                        dif,
                        dem,
                        osc: dif - dem,
                    })
            }
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<MacdValue> {
        self.current
    }
}

impl Display for Macd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MACD({}, {}, {}, {})",
            self.config.fast, self.config.slow, self.config.signal, self.config.source
        )
    }
}
