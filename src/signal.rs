use std::fmt::Display;

use serde::Serialize;

use crate::{Price, Timestamp};

/// What a [`Signal`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Series A crossed above series B.
    GoldenCross,
    /// Series A crossed below series B.
    DeathCross,
    /// Price made a higher high while the indicator made a lower high.
    BearishDivergence,
    /// Price made a lower low while the indicator made a higher low.
    BullishDivergence,
    /// Price above a thick cloud with rising money flow.
    Buy,
    /// Money flowing in while price is still in a range or under the cloud.
    Accumulation,
    /// Price broke out without money flow behind it.
    FakeBreakout,
    /// Momentum fading while the trend still holds.
    Weakness,
    /// Holding position invalidated.
    Exit,
    /// Entry after a price low that OBV refused to confirm.
    DivergenceEntry,
    /// Price broke the entry low or the trend turned.
    StopLoss,
}

impl Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::GoldenCross => "golden cross",
            Self::DeathCross => "death cross",
            Self::BearishDivergence => "bearish divergence",
            Self::BullishDivergence => "bullish divergence",
            Self::Buy => "buy",
            Self::Accumulation => "accumulation",
            Self::FakeBreakout => "fake breakout",
            Self::Weakness => "weakness",
            Self::Exit => "exit",
            Self::DivergenceEntry => "divergence entry",
            Self::StopLoss => "stop loss",
        };
        f.write_str(label)
    }
}

/// A discrete, timestamped event emitted by a detector.
///
/// `price` is the level the marker belongs at, which need not be the bar's
/// close (a buy marker sits below the low).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub time: Timestamp,
    pub kind: SignalKind,
    pub price: Price,
    pub description: String,
}

impl Signal {
    #[must_use]
    pub fn new(time: Timestamp, kind: SignalKind, price: Price, description: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            price,
            description: description.into(),
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} @ {}: {}",
            self.time, self.kind, self.price, self.description
        )
    }
}
