use std::fmt::Display;

use serde::Serialize;
use tracing::debug;

use crate::{Ohlcv, Price, Timestamp};

/// Direction of a [`Gap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// The bar's low is above the previous bar's high.
    Up,
    /// The bar's high is below the previous bar's low.
    Down,
}

impl Display for GapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// A price discontinuity between two consecutive bars.
///
/// `high` and `low` bound the untraded zone: for an up gap that is
/// `previous_high..current_low`, for a down gap `current_high..previous_low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gap {
    /// Open time of the bar that gapped.
    pub time: Timestamp,
    pub kind: GapKind,
    /// Width of the zone in price units.
    pub size: Price,
    /// `size` relative to the previous close, in percent.
    pub size_percent: f64,
    pub high: Price,
    pub low: Price,
    pub previous_close: Price,
    pub current_open: Price,
    pub previous_high: Price,
    pub current_low: Price,
}

impl Display for Gap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Gap({}, {}, {:.2} / {:.2}%)",
            self.time, self.kind, self.size, self.size_percent
        )
    }
}

/// Thresholds for [`detect_gaps_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapConfig {
    /// Smallest gap kept, in percent of the previous close.
    pub min_gap_percent: f64,
    /// Smallest gap kept, in price units. Filters float noise on tiny gaps.
    pub min_size: Price,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            min_gap_percent: 0.5,
            min_size: 0.01,
        }
    }
}

/// Finds gaps of at least `min_gap_percent` between consecutive bars.
///
/// ```
/// use barlens_ta::{Bar, GapKind, detect_gaps};
///
/// let bars = [
///     Bar::new(1, 96.0, 100.0, 95.0, 98.0, 0.0),
///     Bar::new(2, 101.5, 103.0, 101.0, 102.0, 0.0),
/// ];
///
/// let gaps = detect_gaps(&bars, 0.5);
/// assert_eq!(gaps.len(), 1);
/// assert_eq!(gaps[0].kind, GapKind::Up);
/// assert!((gaps[0].size - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn detect_gaps(bars: &[impl Ohlcv], min_gap_percent: f64) -> Vec<Gap> {
    detect_gaps_with(
        bars,
        &GapConfig {
            min_gap_percent,
            ..GapConfig::default()
        },
    )
}

/// Finds gaps between consecutive bars passing both thresholds of `config`.
///
/// Bars with a zero previous close are skipped since the gap has no
/// meaningful percentage.
#[must_use]
pub fn detect_gaps_with(bars: &[impl Ohlcv], config: &GapConfig) -> Vec<Gap> {
    let gaps: Vec<Gap> = bars
        .windows(2)
        .filter_map(|pair| gap_between(&pair[0], &pair[1], config))
        .collect();

    debug!(bars = bars.len(), gaps = gaps.len(), "gap scan finished");
    gaps
}

fn gap_between(previous: &impl Ohlcv, current: &impl Ohlcv, config: &GapConfig) -> Option<Gap> {
    let (kind, high, low) = if current.low() > previous.high() {
        (GapKind::Up, current.low(), previous.high())
    } else if current.high() < previous.low() {
        (GapKind::Down, previous.low(), current.high())
    } else {
        return None;
    };

    if previous.close() == 0.0 {
        return None;
    }

    let size = high - low;
    let size_percent = size / previous.close() * 100.0;

    if size_percent < config.min_gap_percent || size <= config.min_size {
        return None;
    }

    debug!(time = current.open_time(), %kind, size, size_percent, "gap detected");

    Some(Gap {
        time: current.open_time(),
        kind,
        size,
        size_percent,
        high,
        low,
        previous_close: previous.close(),
        current_open: current.open(),
        previous_high: previous.high(),
        current_low: current.low(),
    })
}

/// How far later bars have retraced into a gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapFill {
    /// First later bar that traded inside the zone.
    pub entered: Option<Timestamp>,
    /// First later bar that traded through the whole zone.
    pub closed: Option<Timestamp>,
}

impl GapFill {
    /// Whether price has come back into the gap at all.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.entered.is_some()
    }
}

/// Fill status of `gap` over `later_bars`, which must all come after the gap.
///
/// An up gap is entered by the first low at or below `gap.high` and closed by
/// the first low at or below `gap.low`. Down gaps mirror this on highs.
#[must_use]
pub fn gap_fill(gap: &Gap, later_bars: &[impl Ohlcv]) -> GapFill {
    let mut fill = GapFill::default();
    for bar in later_bars {
        let (enters, closes) = match gap.kind {
            GapKind::Up => (bar.low() <= gap.high, bar.low() <= gap.low),
            GapKind::Down => (bar.high() >= gap.low, bar.high() >= gap.high),
        };
        if enters && fill.entered.is_none() {
            fill.entered = Some(bar.open_time());
        }
        if closes {
            fill.closed = Some(bar.open_time());
            break;
        }
    }
    fill
}

/// Pairs every gap with its fill status over the bars strictly after it.
///
/// `bars` must be sorted by open time, as for [`detect_gaps`].
#[must_use]
pub fn annotate_fills(bars: &[impl Ohlcv], gaps: &[Gap]) -> Vec<(Gap, GapFill)> {
    gaps.iter()
        .map(|gap| {
            let after = bars.partition_point(|bar| bar.open_time() <= gap.time);
            (*gap, gap_fill(gap, &bars[after..]))
        })
        .collect()
}

/// The last `count` gaps at or above `min_gap_percent`.
#[must_use]
pub fn recent_gaps(bars: &[impl Ohlcv], count: usize, min_gap_percent: f64) -> Vec<Gap> {
    let gaps = detect_gaps(bars, min_gap_percent);
    let skip = gaps.len().saturating_sub(count);
    gaps[skip..].to_vec()
}

/// Sorts gaps by `size_percent`, largest first unless `ascending`.
pub fn sort_by_size(gaps: &mut [Gap], ascending: bool) {
    gaps.sort_by(|a, b| {
        let order = a.size_percent.total_cmp(&b.size_percent);
        if ascending { order } else { order.reverse() }
    });
}

/// Summary counts and averages over a set of gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GapStatistics {
    pub total: usize,
    pub up_count: usize,
    pub down_count: usize,
    /// Mean `size_percent` of up gaps, `0` without any.
    pub average_up_percent: f64,
    /// Mean `size_percent` of down gaps, `0` without any.
    pub average_down_percent: f64,
    pub largest: Option<Gap>,
}

impl GapStatistics {
    #[must_use]
    pub fn from_gaps(gaps: &[Gap]) -> Self {
        let average = |kind: GapKind| {
            let (count, sum) = gaps
                .iter()
                .filter(|g| g.kind == kind)
                .fold((0usize, 0.0), |(n, sum), g| (n + 1, sum + g.size_percent));
            #[allow(clippy::cast_precision_loss)]
            let mean = if count == 0 { 0.0 } else { sum / count as f64 };
            (count, mean)
        };

        let (up_count, average_up_percent) = average(GapKind::Up);
        let (down_count, average_down_percent) = average(GapKind::Down);

        let largest = gaps
            .iter()
            .copied()
            .filter(|g| g.size_percent > 0.0)
            .reduce(|largest, g| {
                if g.size_percent > largest.size_percent {
                    g
                } else {
                    largest
                }
            });

        Self {
            total: gaps.len(),
            up_count,
            down_count,
            average_up_percent,
            average_down_percent,
            largest,
        }
    }
}
