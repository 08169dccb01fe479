use std::{fmt::Display, num::NonZero};

use serde::Serialize;

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    indicator::debug_assert_advancing, wilder::Wilder,
};

/// Configuration for the Directional Movement Index ([`Dmi`]).
///
/// ```
/// use barlens_ta::{DmiConfig, IndicatorConfig};
/// use std::num::NonZero;
///
/// let config = DmiConfig::new(NonZero::new(14).unwrap());
/// // +DI / −DI from bar 14, ADX from bar 27
/// assert_eq!(config.required_bars(), 15);
/// assert_eq!(config.adx_required_bars(), 28);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct DmiConfig {
    length: usize,
}

impl IndicatorConfig for DmiConfig {
    type Builder = DmiConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        DmiConfigBuilder { length: None }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length + 1
    }
}

impl DmiConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Bars consumed before [`DmiValue::adx`] becomes available.
    #[inline]
    #[must_use]
    pub fn adx_required_bars(&self) -> usize {
        2 * self.length
    }
}

impl Display for DmiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DmiConfig({})", self.length)
    }
}

pub struct DmiConfigBuilder {
    length: Option<usize>,
}

impl DmiConfigBuilder {
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }
}

impl IndicatorConfigBuilder<DmiConfig> for DmiConfigBuilder {
    #[inline]
    fn build(self) -> DmiConfig {
        DmiConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// DMI output. `adx` trails the DI lines by `length − 1` bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DmiValue {
    plus_di: f64,
    minus_di: f64,
    adx: Option<f64>,
}

impl DmiValue {
    /// `+DI = 100 × smoothed(+DM) / ATR`.
    #[inline]
    #[must_use]
    pub fn plus_di(&self) -> f64 {
        self.plus_di
    }

    /// `−DI = 100 × smoothed(−DM) / ATR`.
    #[inline]
    #[must_use]
    pub fn minus_di(&self) -> f64 {
        self.minus_di
    }

    /// Wilder-smoothed DX, `None` until enough DX samples exist.
    #[inline]
    #[must_use]
    pub fn adx(&self) -> Option<f64> {
        self.adx
    }
}

impl Display for DmiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DMI(+di: {}, -di: {}, adx: ", self.plus_di, self.minus_di)?;
        match self.adx {
            Some(adx) => write!(f, "{adx})"),
            None => write!(f, "-)"),
        }
    }
}

/// Directional Movement Index with ADX.
///
/// ```text
/// up   = high − prev_high
/// down = prev_low − low
/// +DM  = up   if up > down and up > 0, else 0
/// −DM  = down if down > up and down > 0, else 0
/// +DI  = 100 × wilder(+DM) / wilder(TR)
/// −DI  = 100 × wilder(−DM) / wilder(TR)
/// DX   = 100 × |+DI − −DI| / (+DI + −DI)
/// ADX  = wilder(DX)
/// ```
///
/// A zero ATR yields zero DI lines; a zero DI sum yields a zero DX.
#[derive(Clone, Debug)]
pub struct Dmi {
    config: DmiConfig,
    prev: Option<(Price, Price, Price)>,
    true_range: Wilder,
    plus_dm: Wilder,
    minus_dm: Wilder,
    adx: Wilder,
    current: Option<DmiValue>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Dmi {
    type Config = DmiConfig;
    type Output = DmiValue;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            prev: None,
            true_range: Wilder::new(config.length),
            plus_dm: Wilder::new(config.length),
            minus_dm: Wilder::new(config.length),
            adx: Wilder::new(config.length),
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<DmiValue> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let (high, low) = (ohlcv.high(), ohlcv.low());
        let Some((prev_high, prev_low, prev_close)) =
            self.prev.replace((high, low, ohlcv.close()))
        else {
            return None;
        };

        let up = high - prev_high;
        let down = prev_low - low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = PriceSource::TrueRange.extract(ohlcv, Some(prev_close));

        let atr = self.true_range.push(tr);
        let plus = self.plus_dm.push(plus_dm);
        let minus = self.minus_dm.push(minus_dm);

        let (Some(atr), Some(plus), Some(minus)) = (atr, plus, minus) else {
            return None;
        };

        let (plus_di, minus_di) = if atr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * plus / atr, 100.0 * minus / atr)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };

        self.current = Some(DmiValue {
            plus_di,
            minus_di,
            adx: self.adx.push(dx),
        });

        self.current
    }

    #[inline]
    fn value(&self) -> Option<DmiValue> {
        self.current
    }
}

impl Display for Dmi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DMI({})", self.config.length)
    }
}
