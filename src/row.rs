use std::fmt::Display;

use serde::Serialize;

use crate::{
    Bar, BbValue, DmiValue, IchimokuValue, KdValue, MacdValue, Ohlcv, Price, SmaValue, Timestamp,
};

/// Moving-average alignment of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// MA5 > MA10 > MA20 > MA60 > MA240.
    Bullish,
    /// MA5 < MA10 < MA20 < MA60 < MA240.
    Bearish,
    /// Anything else, including missing averages.
    #[default]
    Ranging,
}

impl Trend {
    /// Lengths of the averages whose ordering decides the trend, shortest first.
    pub const MA_LENGTHS: [usize; 5] = [5, 10, 20, 60, 240];

    /// Classifies averages given shortest period first.
    ///
    /// ```
    /// use barlens_ta::Trend;
    ///
    /// assert_eq!(Trend::classify(&[Some(5.0), Some(4.0), Some(3.0)]), Trend::Bullish);
    /// assert_eq!(Trend::classify(&[Some(5.0), None, Some(3.0)]), Trend::Ranging);
    /// ```
    #[must_use]
    pub fn classify(averages: &[Option<Price>]) -> Self {
        let Some(values) = averages.iter().copied().collect::<Option<Vec<_>>>() else {
            return Self::Ranging;
        };

        if values.len() < 2 {
            Self::Ranging
        } else if values.windows(2).all(|w| w[0] > w[1]) {
            Self::Bullish
        } else if values.windows(2).all(|w| w[0] < w[1]) {
            Self::Bearish
        } else {
            Self::Ranging
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Ranging => "ranging",
        };
        f.write_str(label)
    }
}

/// One bar with every configured indicator's output at that bar.
///
/// `None` means the indicator is not configured or not yet available.
/// Multi-period indicators keep one `(length, value)` entry per configured
/// length, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    pub bar: Bar,
    pub ma: Vec<(usize, Option<SmaValue>)>,
    pub volume_ma: Vec<(usize, Option<SmaValue>)>,
    pub boll: Option<BbValue>,
    pub kd: Option<KdValue>,
    pub rsi: Vec<(usize, Option<f64>)>,
    pub mfi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub obv: Option<f64>,
    pub obv_ema: Option<f64>,
    pub cmf: Option<f64>,
    pub cmf_ema: Option<f64>,
    pub dmi: Option<DmiValue>,
    pub ichimoku: Option<IchimokuValue>,
    pub trend: Trend,
}

fn lookup<T: Copy>(series: &[(usize, Option<T>)], length: usize) -> Option<T> {
    series
        .iter()
        .find(|(l, _)| *l == length)
        .and_then(|(_, value)| *value)
}

impl EnrichedRow {
    pub(crate) fn new(bar: Bar) -> Self {
        Self {
            bar,
            ma: Vec::new(),
            volume_ma: Vec::new(),
            boll: None,
            kd: None,
            rsi: Vec::new(),
            mfi: None,
            macd: None,
            obv: None,
            obv_ema: None,
            cmf: None,
            cmf_ema: None,
            dmi: None,
            ichimoku: None,
            trend: Trend::Ranging,
        }
    }

    /// Close moving average of `length`, if configured and available.
    #[must_use]
    pub fn ma(&self, length: usize) -> Option<SmaValue> {
        lookup(&self.ma, length)
    }

    #[must_use]
    pub fn volume_ma(&self, length: usize) -> Option<SmaValue> {
        lookup(&self.volume_ma, length)
    }

    #[must_use]
    pub fn rsi(&self, length: usize) -> Option<f64> {
        lookup(&self.rsi, length)
    }

    pub(crate) fn classify_trend(&mut self) {
        let averages = Trend::MA_LENGTHS.map(|length| self.ma(length).map(|ma| ma.average()));
        self.trend = Trend::classify(&averages);
    }
}

impl Ohlcv for EnrichedRow {
    fn open(&self) -> Price {
        self.bar.o
    }

    fn high(&self) -> Price {
        self.bar.h
    }

    fn low(&self) -> Price {
        self.bar.l
    }

    fn close(&self) -> Price {
        self.bar.c
    }

    fn open_time(&self) -> Timestamp {
        self.bar.t
    }

    fn volume(&self) -> f64 {
        self.bar.v
    }
}
