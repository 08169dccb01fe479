use tracing::debug;

use crate::{CrossDetector, EnrichedRow, Error, Ohlcv, Price, Signal, SignalKind, Timestamp, cross::Cross};

/// Parameters for [`detect_local_extremum_divergence`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalExtremumConfig {
    /// How far back to look for the previous extremum, in bars.
    pub lookback: usize,
    /// Half-width of the neighbourhood a local extremum must dominate.
    pub local: usize,
    /// Minimum relative price move between the two extrema, `0.02` = 2%.
    pub min_price_move: f64,
}

impl Default for LocalExtremumConfig {
    fn default() -> Self {
        Self {
            lookback: 30,
            local: 2,
            min_price_move: 0.02,
        }
    }
}

/// Which divergence strategy [`detect_divergence`] runs over enriched rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DivergenceConfig {
    /// KD `%K` against price, extrema taken between K/D crosses.
    Kd,
    /// OBV against price, extrema taken from local closing highs and lows.
    Obv(LocalExtremumConfig),
}

/// Runs the configured divergence strategy over pipeline output.
///
/// Rows without the required indicator simply produce no signals.
#[must_use]
pub fn detect_divergence(rows: &[EnrichedRow], config: &DivergenceConfig) -> Vec<Signal> {
    let points = rows.iter().map(Point::from_bar);

    match config {
        DivergenceConfig::Kd => {
            let points: Vec<_> = points
                .zip(rows)
                .map(|(point, row)| point.with(row.kd.map(|kd| kd.k()), row.kd.map(|kd| kd.d())))
                .collect();
            cross_interval(&points)
        }
        DivergenceConfig::Obv(config) => {
            let points: Vec<_> = points
                .zip(rows)
                .map(|(point, row)| point.with(row.obv, None))
                .collect();
            local_extremum(&points, config)
        }
    }
}

/// Oscillator-vs-price divergence over the intervals between crosses.
///
/// Between a golden cross of `oscillator` over `signal_line` and the next
/// death cross (inclusive, or the last bar) the oscillator's maximum is a
/// peak, priced at that bar's high. Between a death cross and the next golden
/// cross its minimum is a trough, priced at that bar's low. Consecutive peaks
/// with a higher price and a lower oscillator are bearish; consecutive
/// troughs with a lower price and a higher oscillator are bullish.
///
/// # Errors
///
/// [`Error::SeriesLengthMismatch`] when a series is not aligned with `bars`.
pub fn detect_cross_interval_divergence(
    bars: &[impl Ohlcv],
    oscillator: &[Option<f64>],
    signal_line: &[Option<f64>],
) -> Result<Vec<Signal>, Error> {
    check_aligned(bars.len(), oscillator.len())?;
    check_aligned(bars.len(), signal_line.len())?;

    let points: Vec<_> = bars
        .iter()
        .zip(oscillator.iter().zip(signal_line))
        .map(|(bar, (&osc, &signal))| Point::from_bar(bar).with(osc, signal))
        .collect();

    Ok(cross_interval(&points))
}

/// Cumulative-indicator-vs-price divergence between local extrema.
///
/// A bar is a local high when no bar within `±local` closes strictly higher,
/// and mirrored for lows. From each local extremum the scan walks back at
/// most `lookback` bars to the nearest earlier extremum of the same kind.
///
/// * Bearish: close or high rose by more than `min_price_move` while the
///   indicator fell. Priced at the bar's high.
/// * Bullish: close fell by more than `min_price_move` while the indicator
///   rose. Priced at the bar's close.
///
/// # Errors
///
/// [`Error::SeriesLengthMismatch`] when `indicator` is not aligned with `bars`.
pub fn detect_local_extremum_divergence(
    bars: &[impl Ohlcv],
    indicator: &[Option<f64>],
    config: &LocalExtremumConfig,
) -> Result<Vec<Signal>, Error> {
    check_aligned(bars.len(), indicator.len())?;

    let points: Vec<_> = bars
        .iter()
        .zip(indicator)
        .map(|(bar, &value)| Point::from_bar(bar).with(value, None))
        .collect();

    Ok(local_extremum(&points, config))
}

fn check_aligned(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::SeriesLengthMismatch { expected, actual })
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    time: Timestamp,
    high: Price,
    low: Price,
    close: Price,
    value: Option<f64>,
    signal: Option<f64>,
}

impl Point {
    fn from_bar(bar: &impl Ohlcv) -> Self {
        Self {
            time: bar.open_time(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
            value: None,
            signal: None,
        }
    }

    fn with(mut self, value: Option<f64>, signal: Option<f64>) -> Self {
        self.value = value;
        self.signal = signal;
        self
    }
}

/// Oscillator extremum found inside a cross interval.
#[derive(Debug, Clone, Copy)]
struct Extremum {
    index: usize,
    time: Timestamp,
    price: Price,
    value: f64,
}

fn cross_interval(points: &[Point]) -> Vec<Signal> {
    let mut detector = CrossDetector::new();
    let mut crosses: Vec<(usize, Cross)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| detector.update(p.value, p.signal).map(|cross| (i, cross)))
        .collect();
    // Touching the signal line and moving on repeats a cross. Only the first
    // of a run opens an interval, so intervals never overlap.
    crosses.dedup_by_key(|&mut (_, cross)| cross);

    let interval_extremum = |start: usize, opening: Cross| {
        let end = crosses
            .iter()
            .find(|&&(i, cross)| i > start && cross != opening)
            .map_or(points.len() - 1, |&(i, _)| i);

        let candidates = points[start..=end]
            .iter()
            .enumerate()
            .filter_map(|(offset, p)| p.value.map(|v| (start + offset, p, v)));

        let best = match opening {
            Cross::Golden => candidates.fold(None, |best: Option<(usize, &Point, f64)>, c| {
                best.filter(|b| b.2 >= c.2).or(Some(c))
            }),
            Cross::Death => candidates.fold(None, |best: Option<(usize, &Point, f64)>, c| {
                best.filter(|b| b.2 <= c.2).or(Some(c))
            }),
        };

        best.map(|(index, p, value)| Extremum {
            index,
            time: p.time,
            price: match opening {
                Cross::Golden => p.high,
                Cross::Death => p.low,
            },
            value,
        })
    };

    let extrema = |kind: Cross| -> Vec<Extremum> {
        crosses
            .iter()
            .filter(|&&(_, cross)| cross == kind)
            .filter_map(|&(start, cross)| interval_extremum(start, cross))
            .collect()
    };

    let mut signals = Vec::new();

    for pair in extrema(Cross::Golden).windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.price > prev.price && cur.value < prev.value {
            signals.push(divergence_signal(SignalKind::BearishDivergence, &prev, &cur));
        }
    }

    for pair in extrema(Cross::Death).windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.price < prev.price && cur.value > prev.value {
            signals.push(divergence_signal(SignalKind::BullishDivergence, &prev, &cur));
        }
    }

    signals.sort_by_key(|s| s.time);
    signals
}

fn divergence_signal(kind: SignalKind, prev: &Extremum, cur: &Extremum) -> Signal {
    let price_change = percent_change(prev.price, cur.price);
    let (verb, extremum) = match kind {
        SignalKind::BearishDivergence => ("fell", "high"),
        _ => ("rose", "low"),
    };

    let description = format!(
        "price {extremum} moved {price_change:+.1}% over {} bars ({:.2} -> {:.2}) while the oscillator {verb} {:.1} points ({:.1} -> {:.1})",
        cur.index - prev.index,
        prev.price,
        cur.price,
        (cur.value - prev.value).abs(),
        prev.value,
        cur.value,
    );

    debug!(time = cur.time, %kind, %description, "divergence detected");

    Signal::new(cur.time, kind, cur.price, description)
}

fn percent_change(from: Price, to: Price) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

/// Relative move from `from` to `to`, `None` when `from` is zero.
fn relative_move(from: Price, to: Price) -> Option<f64> {
    (from != 0.0).then(|| (to - from) / from)
}

fn local_extremum(points: &[Point], config: &LocalExtremumConfig) -> Vec<Signal> {
    let local = config.local;
    let n = points.len();

    let is_extremum = |index: usize, beats: fn(f64, f64) -> bool| {
        if index < local || index + local >= n {
            return false;
        }
        let close = points[index].close;
        (index - local..=index + local)
            .filter(|&i| i != index)
            .all(|i| !beats(points[i].close, close))
    };
    let is_high = |i: usize| is_extremum(i, |other, close| other > close);
    let is_low = |i: usize| is_extremum(i, |other, close| other < close);

    // Nearest same-kind extremum far enough back not to share a neighbourhood.
    let previous = |i: usize, matches: &dyn Fn(usize) -> bool| {
        let newest = i.checked_sub(2 * local + 1)?;
        let oldest = local.max(i.saturating_sub(config.lookback));
        (oldest..=newest).rev().find(|&j| matches(j))
    };

    let mut signals = Vec::new();

    for i in local..n.saturating_sub(local) {
        let cur = &points[i];

        if is_high(i)
            && let Some(j) = previous(i, &is_high)
        {
            let prev = &points[j];
            let beyond = |m: &f64| *m > config.min_price_move;
            let price_up = relative_move(prev.close, cur.close)
                .filter(beyond)
                .map(|m| ("close", m))
                .or_else(|| {
                    relative_move(prev.high, cur.high)
                        .filter(beyond)
                        .map(|m| ("high", m))
                });

            if let (Some((field, rise)), Some(value), Some(prev_value)) =
                (price_up, cur.value, prev.value)
                && value < prev_value
            {
                let description = format!(
                    "{field} up {:.1}% from the high {} bars earlier while the indicator fell from {prev_value:.0} to {value:.0}",
                    rise * 100.0,
                    i - j,
                );
                debug!(time = cur.time, %description, "bearish divergence detected");
                signals.push(Signal::new(
                    cur.time,
                    SignalKind::BearishDivergence,
                    cur.high,
                    description,
                ));
            }
        }

        if is_low(i)
            && let Some(j) = previous(i, &is_low)
        {
            let prev = &points[j];
            let drop = relative_move(prev.close, cur.close).map(|m| -m);
            let price_down = drop.is_some_and(|m| m > config.min_price_move);

            if let (true, Some(value), Some(prev_value)) = (price_down, cur.value, prev.value)
                && value > prev_value
            {
                let drop = drop.unwrap_or_default();
                let description = format!(
                    "close down {:.1}% from the low {} bars earlier while the indicator rose from {prev_value:.0} to {value:.0}",
                    drop * 100.0,
                    i - j,
                );
                debug!(time = cur.time, %description, "bullish divergence detected");
                signals.push(Signal::new(
                    cur.time,
                    SignalKind::BullishDivergence,
                    cur.close,
                    description,
                ));
            }
        }
    }

    signals
}
