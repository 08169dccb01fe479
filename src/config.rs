use std::num::NonZero;

use serde::{Deserialize, Serialize};

use crate::{IchimokuConfig, IndicatorConfig, IndicatorConfigBuilder, MacdConfig};

const fn nz(n: usize) -> NonZero<usize> {
    match NonZero::new(n) {
        Some(n) => n,
        None => panic!("length must be non-zero"),
    }
}

/// MACD periods as they appear in a pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacdLengths {
    pub fast: NonZero<usize>,
    pub slow: NonZero<usize>,
    pub signal: NonZero<usize>,
}

impl Default for MacdLengths {
    fn default() -> Self {
        Self {
            fast: nz(12),
            slow: nz(26),
            signal: nz(9),
        }
    }
}

impl From<MacdLengths> for MacdConfig {
    fn from(lengths: MacdLengths) -> Self {
        MacdConfig::builder()
            .fast_length(lengths.fast)
            .slow_length(lengths.slow)
            .signal_length(lengths.signal)
            .build()
    }
}

/// Ichimoku periods as they appear in a pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IchimokuLengths {
    pub tenkan: NonZero<usize>,
    pub kijun: NonZero<usize>,
    pub senkou_b: NonZero<usize>,
}

impl Default for IchimokuLengths {
    fn default() -> Self {
        Self {
            tenkan: nz(9),
            kijun: nz(26),
            senkou_b: nz(52),
        }
    }
}

impl From<IchimokuLengths> for IchimokuConfig {
    fn from(lengths: IchimokuLengths) -> Self {
        IchimokuConfig::builder()
            .tenkan_length(lengths.tenkan)
            .kijun_length(lengths.kijun)
            .senkou_b_length(lengths.senkou_b)
            .build()
    }
}

/// Which indicators a [`Pipeline`](crate::Pipeline) computes, and with which
/// periods.
///
/// Every field has a default, so a document only names what it changes.
/// A `null` single indicator (or an empty list) turns it off. Zero periods
/// are rejected while parsing.
///
/// `obv_ema` is only computed when `obv` is on, `cmf_ema` only when `cmf` is.
///
/// ```
/// use barlens_ta::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{ "ma": [5, 20], "ichimoku": null }"#).unwrap();
///
/// assert_eq!(config.ma.len(), 2);
/// assert!(config.ichimoku.is_none());
/// assert_eq!(config.kd.map(|n| n.get()), Some(9));
/// assert!(serde_json::from_str::<PipelineConfig>(r#"{ "kd": 0 }"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Moving averages of the close.
    pub ma: Vec<NonZero<usize>>,
    /// Moving averages of the volume.
    pub volume_ma: Vec<NonZero<usize>>,
    pub boll: Option<NonZero<usize>>,
    pub kd: Option<NonZero<usize>>,
    pub rsi: Vec<NonZero<usize>>,
    pub mfi: Option<NonZero<usize>>,
    pub macd: Option<MacdLengths>,
    pub obv: bool,
    pub obv_ema: Option<NonZero<usize>>,
    pub cmf: Option<NonZero<usize>>,
    pub cmf_ema: Option<NonZero<usize>>,
    pub dmi: Option<NonZero<usize>>,
    pub ichimoku: Option<IchimokuLengths>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ma: [5, 10, 20, 60, 120, 240].map(nz).to_vec(),
            volume_ma: [10, 20].map(nz).to_vec(),
            boll: Some(nz(20)),
            kd: Some(nz(9)),
            rsi: [5, 10].map(nz).to_vec(),
            mfi: Some(nz(14)),
            macd: Some(MacdLengths::default()),
            obv: true,
            obv_ema: Some(nz(10)),
            cmf: Some(nz(21)),
            cmf_ema: Some(nz(5)),
            dmi: Some(nz(14)),
            ichimoku: Some(IchimokuLengths::default()),
        }
    }
}

impl PipelineConfig {
    /// A configuration with every indicator turned off.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ma: Vec::new(),
            volume_ma: Vec::new(),
            boll: None,
            kd: None,
            rsi: Vec::new(),
            mfi: None,
            macd: None,
            obv: false,
            obv_ema: None,
            cmf: None,
            cmf_ema: None,
            dmi: None,
            ichimoku: None,
        }
    }
}
