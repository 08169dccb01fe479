use std::{fmt::Display, num::NonZero};

use serde::Serialize;

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, Timestamp,
    extremum_window::ExtremumWindow, indicator::debug_assert_advancing,
};

const DEFAULT_TENKAN: NonZero<usize> = NonZero::new(9).unwrap();
const DEFAULT_KIJUN: NonZero<usize> = NonZero::new(26).unwrap();
const DEFAULT_SENKOU_B: NonZero<usize> = NonZero::new(52).unwrap();

/// Forward shift of the cloud and backward shift of the lagging span.
pub const DISPLACEMENT: usize = 26;

/// Configuration for the Ichimoku Cloud ([`Ichimoku`]).
///
/// ```
/// use barlens_ta::{IchimokuConfig, IndicatorConfig};
///
/// let config = IchimokuConfig::default();
/// assert_eq!(config.tenkan_length(), 9);
/// assert_eq!(config.kijun_length(), 26);
/// assert_eq!(config.senkou_b_length(), 52);
/// assert_eq!(config.required_bars(), 1);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct IchimokuConfig {
    tenkan: NonZero<usize>,
    kijun: NonZero<usize>,
    senkou_b: NonZero<usize>,
}

impl IndicatorConfig for IchimokuConfig {
    type Builder = IchimokuConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        IchimokuConfigBuilder {
            config: Self::default(),
        }
    }

    /// The lagging span exists from the first bar; each line fills in as its
    /// own window completes.
    #[inline]
    fn required_bars(&self) -> usize {
        1
    }
}

impl IchimokuConfig {
    #[inline]
    #[must_use]
    pub fn tenkan_length(&self) -> usize {
        self.tenkan.get()
    }

    #[inline]
    #[must_use]
    pub fn kijun_length(&self) -> usize {
        self.kijun.get()
    }

    #[inline]
    #[must_use]
    pub fn senkou_b_length(&self) -> usize {
        self.senkou_b.get()
    }
}

impl Default for IchimokuConfig {
    /// Ichimoku(9, 26, 52).
    fn default() -> Self {
        Self {
            tenkan: DEFAULT_TENKAN,
            kijun: DEFAULT_KIJUN,
            senkou_b: DEFAULT_SENKOU_B,
        }
    }
}

impl Display for IchimokuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IchimokuConfig({}, {}, {})",
            self.tenkan, self.kijun, self.senkou_b
        )
    }
}

pub struct IchimokuConfigBuilder {
    config: IchimokuConfig,
}

impl IchimokuConfigBuilder {
    #[inline]
    #[must_use]
    pub fn tenkan_length(mut self, length: NonZero<usize>) -> Self {
        self.config.tenkan = length;
        self
    }

    #[inline]
    #[must_use]
    pub fn kijun_length(mut self, length: NonZero<usize>) -> Self {
        self.config.kijun = length;
        self
    }

    #[inline]
    #[must_use]
    pub fn senkou_b_length(mut self, length: NonZero<usize>) -> Self {
        self.config.senkou_b = length;
        self
    }
}

impl IndicatorConfigBuilder<IchimokuConfig> for IchimokuConfigBuilder {
    #[inline]
    fn build(self) -> IchimokuConfig {
        self.config
    }
}

/// Ichimoku lines as computed at a bar, before any display shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IchimokuValue {
    tenkan: Option<Price>,
    kijun: Option<Price>,
    senkou_a: Option<Price>,
    senkou_b: Option<Price>,
    chikou: Price,
}

impl IchimokuValue {
    /// Conversion line: midpoint of the short window's range.
    #[inline]
    #[must_use]
    pub fn tenkan(&self) -> Option<Price> {
        self.tenkan
    }

    /// Base line: midpoint of the medium window's range.
    #[inline]
    #[must_use]
    pub fn kijun(&self) -> Option<Price> {
        self.kijun
    }

    /// Leading span A: `(tenkan + kijun) / 2`.
    #[inline]
    #[must_use]
    pub fn senkou_a(&self) -> Option<Price> {
        self.senkou_a
    }

    /// Leading span B: midpoint of the long window's range.
    #[inline]
    #[must_use]
    pub fn senkou_b(&self) -> Option<Price> {
        self.senkou_b
    }

    /// Lagging span: the bar's close.
    #[inline]
    #[must_use]
    pub fn chikou(&self) -> Price {
        self.chikou
    }
}

impl Display for IchimokuValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let line = |v: Option<Price>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(
            f,
            "Ichimoku(tenkan: {}, kijun: {}, a: {}, b: {}, chikou: {})",
            line(self.tenkan),
            line(self.kijun),
            line(self.senkou_a),
            line(self.senkou_b),
            self.chikou
        )
    }
}

/// Ichimoku Kinko Hyo.
///
/// ```text
/// tenkan   = (highest_high(9)  + lowest_low(9))  / 2
/// kijun    = (highest_high(26) + lowest_low(26)) / 2
/// senkou_a = (tenkan + kijun) / 2
/// senkou_b = (highest_high(52) + lowest_low(52)) / 2
/// chikou   = close
/// ```
///
/// Values are reported at the bar they are computed from. The chart shift
/// (cloud forward, lagging span backward) is applied by [`display_rows`].
#[derive(Clone, Debug)]
pub struct Ichimoku {
    config: IchimokuConfig,
    tenkan: ExtremumWindow,
    kijun: ExtremumWindow,
    senkou_b: ExtremumWindow,
    current: Option<IchimokuValue>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Ichimoku {
    type Config = IchimokuConfig;
    type Output = IchimokuValue;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            tenkan: ExtremumWindow::new(config.tenkan.get()),
            kijun: ExtremumWindow::new(config.kijun.get()),
            senkou_b: ExtremumWindow::new(config.senkou_b.get()),
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<IchimokuValue> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let (high, low) = (ohlcv.high(), ohlcv.low());
        self.tenkan.push(high, low);
        self.kijun.push(high, low);
        self.senkou_b.push(high, low);

        let tenkan = self.tenkan.midpoint();
        let kijun = self.kijun.midpoint();

        self.current = Some(IchimokuValue {
            tenkan,
            kijun,
            senkou_a: tenkan.zip(kijun).map(|(t, k)| f64::midpoint(t, k)),
            senkou_b: self.senkou_b.midpoint(),
            chikou: ohlcv.close(),
        });

        self.current
    }

    #[inline]
    fn value(&self) -> Option<IchimokuValue> {
        self.current
    }
}

impl Display for Ichimoku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ICHIMOKU({}, {}, {})",
            self.config.tenkan, self.config.kijun, self.config.senkou_b
        )
    }
}

/// One chart row with the Ichimoku display shift applied.
///
/// Projected rows past the last bar have no `time` and carry only the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IchimokuDisplayRow {
    pub time: Option<Timestamp>,
    pub tenkan: Option<Price>,
    pub kijun: Option<Price>,
    /// Span A computed `displacement` bars earlier.
    pub senkou_a: Option<Price>,
    /// Span B computed `displacement` bars earlier.
    pub senkou_b: Option<Price>,
    /// Close `displacement` bars later.
    pub chikou: Option<Price>,
}

impl IchimokuDisplayRow {
    /// Upper edge of the visible cloud.
    #[must_use]
    pub fn cloud_top(&self) -> Option<Price> {
        self.senkou_a.zip(self.senkou_b).map(|(a, b)| a.max(b))
    }

    /// Lower edge of the visible cloud.
    #[must_use]
    pub fn cloud_bottom(&self) -> Option<Price> {
        self.senkou_a.zip(self.senkou_b).map(|(a, b)| a.min(b))
    }
}

/// Builds chart rows from per-bar Ichimoku values.
///
/// Row `i` shows the cloud computed at `i − displacement` and the lagging
/// span from `close(i + displacement)`. After the last bar, `displacement`
/// projected rows carry the cloud of the final `displacement` bars. Empty
/// input yields no rows.
///
/// ```
/// use barlens_ta::{Bar, Ichimoku, IchimokuConfig, ichimoku};
///
/// let mut indicator = Ichimoku::new(IchimokuConfig::default());
/// let values: Vec<_> = (0..60u64)
///     .map(|t| {
///         let p = 100.0 + t as f64;
///         let bar = Bar::new(t, p, p + 1.0, p - 1.0, p, 0.0);
///         (t, indicator.compute(&bar).unwrap())
///     })
///     .collect();
///
/// let rows = ichimoku::display_rows(&values, 26);
/// assert_eq!(rows.len(), 60 + 26);
/// assert_eq!(rows[55].senkou_a, values[29].1.senkou_a());
/// assert!(rows[55].senkou_a.is_some());
/// assert_eq!(rows[10].chikou, Some(values[36].1.chikou()));
/// assert_eq!(rows[70].time, None);
/// ```
#[must_use]
pub fn display_rows(
    values: &[(Timestamp, IchimokuValue)],
    displacement: usize,
) -> Vec<IchimokuDisplayRow> {
    if values.is_empty() {
        return Vec::new();
    }

    let leading = |i: usize| {
        i.checked_sub(displacement)
            .and_then(|source| values.get(source))
            .map(|(_, value)| (value.senkou_a, value.senkou_b))
            .unwrap_or_default()
    };

    let mut rows: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(i, (time, value))| {
            let (senkou_a, senkou_b) = leading(i);
            IchimokuDisplayRow {
                time: Some(*time),
                tenkan: value.tenkan,
                kijun: value.kijun,
                senkou_a,
                senkou_b,
                chikou: values.get(i + displacement).map(|(_, v)| v.chikou),
            }
        })
        .collect();

    rows.extend((values.len()..values.len() + displacement).map(|i| {
        let (senkou_a, senkou_b) = leading(i);
        IchimokuDisplayRow {
            time: None,
            tenkan: None,
            kijun: None,
            senkou_a,
            senkou_b,
            chikou: None,
        }
    }));

    rows
}
