use std::fmt::Display;

use crate::{Ohlcv, Price};

/// The scalar an indicator reads from each bar.
///
/// Most indicators default to [`Close`](Self::Close). Derived sources are
/// computed from the bar's own fields, except [`TrueRange`](Self::TrueRange)
/// which also looks at the previous close.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum PriceSource {
    Open,
    High,
    #[default]
    Close,
    Low,
    /// `(h + l) / 2`
    HL2,
    /// `(h + l + c) / 3`, the typical price used by MFI.
    HLC3,
    /// `(o + h + l + c) / 4`
    OHLC4,
    /// `(h + l + 2c) / 4`
    HLCC4,
    /// Largest of `h − l`, `|h − prev c|` and `|l − prev c|`. Plain `h − l`
    /// for the first bar.
    TrueRange,
    /// Bar volume, for volume moving averages.
    Volume,
}

impl Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl PriceSource {
    #[inline]
    pub(crate) fn extract(self, ohlcv: &impl Ohlcv, prev_close: Option<Price>) -> Price {
        let (o, h, l, c) = (ohlcv.open(), ohlcv.high(), ohlcv.low(), ohlcv.close());
        match self {
            Self::Open => o,
            Self::High => h,
            Self::Low => l,
            Self::Close => c,
            Self::HL2 => f64::midpoint(h, l),
            Self::HLC3 => (h + l + c) / 3.0,
            Self::OHLC4 => (o + h + l + c) / 4.0,
            Self::HLCC4 => (h + l + c + c) / 4.0,
            Self::TrueRange => prev_close.map_or(h - l, |pc| {
                (h - l).max((h - pc).abs()).max((l - pc).abs())
            }),
            Self::Volume => ohlcv.volume(),
        }
    }
}
