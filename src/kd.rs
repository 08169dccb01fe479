use std::{fmt::Display, num::NonZero};

use serde::Serialize;

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, Timestamp,
    extremum_window::ExtremumWindow, indicator::debug_assert_advancing,
};

/// Starting value for both K and D before any smoothing.
const NEUTRAL: f64 = 50.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;
const ONE_THIRD: f64 = 1.0 / 3.0;

/// Configuration for the Stochastic oscillator ([`Kd`]).
///
/// # Example
///
/// ```
/// use barlens_ta::{IndicatorConfig, KdConfig};
/// use std::num::NonZero;
///
/// let config = KdConfig::new(NonZero::new(9).unwrap());
/// assert_eq!(config.length(), 9);
/// assert_eq!(config.required_bars(), 9);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct KdConfig {
    length: usize,
}

impl IndicatorConfig for KdConfig {
    type Builder = KdConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        KdConfigBuilder { length: None }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length
    }
}

impl KdConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    /// High/low lookback window.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Display for KdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KdConfig({})", self.length)
    }
}

/// Builder for [`KdConfig`]. Length must be set.
pub struct KdConfigBuilder {
    length: Option<usize>,
}

impl KdConfigBuilder {
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }
}

impl IndicatorConfigBuilder<KdConfig> for KdConfigBuilder {
    #[inline]
    fn build(self) -> KdConfig {
        KdConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// Stochastic oscillator output: smoothed `%K`, its signal `%D` and
/// `J = 3K − 2D`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KdValue {
    k: f64,
    d: f64,
    j: f64,
}

impl KdValue {
    #[inline]
    #[must_use]
    pub fn k(&self) -> f64 {
        self.k
    }

    #[inline]
    #[must_use]
    pub fn d(&self) -> f64 {
        self.d
    }

    #[inline]
    #[must_use]
    pub fn j(&self) -> f64 {
        self.j
    }
}

impl Display for KdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KD(k: {}, d: {}, j: {})", self.k, self.d, self.j)
    }
}

/// Stochastic KD oscillator.
///
/// ```text
/// raw = 100 × (close − lowest_low) / (highest_high − lowest_low)
/// K   = prev_K × 2/3 + raw / 3
/// D   = prev_D × 2/3 + K / 3
/// J   = 3K − 2D
/// ```
///
/// The high/low window spans `length` bars; `prev_K` and `prev_D` start at
/// 50. When the window has no range (`highest_high == lowest_low`) the
/// previous K is held and D keeps smoothing toward it.
///
/// # Example
///
/// ```
/// use barlens_ta::{Bar, Kd, KdConfig};
/// use std::num::NonZero;
///
/// let mut kd = Kd::new(KdConfig::new(NonZero::new(2).unwrap()));
///
/// assert!(kd.compute(&Bar::new(1, 10.0, 12.0, 8.0, 10.0, 0.0)).is_none());
///
/// // Close at the top of the 2-bar range: raw = 100
/// let v = kd.compute(&Bar::new(2, 12.0, 14.0, 9.0, 14.0, 0.0)).unwrap();
/// assert!((v.k() - 200.0 / 3.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct Kd {
    config: KdConfig,
    window: ExtremumWindow,
    prev_k: f64,
    prev_d: f64,
    current: Option<KdValue>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Kd {
    type Config = KdConfig;
    type Output = KdValue;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            window: ExtremumWindow::new(config.length),
            prev_k: NEUTRAL,
            prev_d: NEUTRAL,
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<KdValue> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        self.window.push(ohlcv.high(), ohlcv.low());
        let (highest, lowest) = self.window.range()?;

        let k = match Self::raw(ohlcv.close(), highest, lowest) {
            Some(raw) => self.prev_k.mul_add(TWO_THIRDS, raw * ONE_THIRD),
            None => self.prev_k,
        };
        let d = self.prev_d.mul_add(TWO_THIRDS, k * ONE_THIRD);

        self.prev_k = k;
        self.prev_d = d;
        self.current = Some(KdValue {
            k,
            d,
            j: 3.0f64.mul_add(k, -2.0 * d),
        });

        self.current
    }

    #[inline]
    fn value(&self) -> Option<KdValue> {
        self.current
    }
}

impl Kd {
    #[inline]
    fn raw(close: Price, highest: Price, lowest: Price) -> Option<f64> {
        let range = highest - lowest;
        (range > 0.0).then(|| 100.0 * (close - lowest) / range)
    }
}

impl Display for Kd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KD({})", self.config.length)
    }
}
