use std::{collections::HashMap, num::NonZero};

use tracing::debug;

use crate::{
    Error, Obv, ObvConfig, Ohlcv, Price, Sample, Signal, SignalKind, Sma, SmaConfig, Timestamp,
    validate_sequence,
};

const DEFAULT_PRICE_MA: NonZero<usize> = NonZero::new(20).unwrap();
const DEFAULT_TREND_MA: NonZero<usize> = NonZero::new(60).unwrap();
const DEFAULT_VOLUME_MA: NonZero<usize> = NonZero::new(20).unwrap();
const DEFAULT_OBV_MA: NonZero<usize> = NonZero::new(20).unwrap();

/// Parameters for [`detect_obv_signals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObvStrategyConfig {
    /// Index of the first bar that may signal.
    pub min_bars: usize,
    /// Bars before the current one that form the box: resistance, support,
    /// average close and the OBV range.
    pub range: usize,
    /// MA of the close an entry has to close above.
    pub price_ma: NonZero<usize>,
    /// MA of the close separating weakness from a trend reversal.
    pub trend_ma: NonZero<usize>,
    pub volume_ma: NonZero<usize>,
    pub obv_ma: NonZero<usize>,
    /// Box height over average close below which the range counts as tight.
    pub max_box_width: f64,
    /// Boxes tighter than this on volume under half its average are skipped.
    pub quiet_box_width: f64,
    /// Bars a new price low against firm OBV stays usable for an entry.
    pub divergence_memory: usize,
    /// A kind fires again only after more than this many bars.
    pub cooldown: usize,
    /// Same, for [`SignalKind::Accumulation`].
    pub accumulation_cooldown: usize,
}

impl Default for ObvStrategyConfig {
    fn default() -> Self {
        Self {
            min_bars: 60,
            range: 20,
            price_ma: DEFAULT_PRICE_MA,
            trend_ma: DEFAULT_TREND_MA,
            volume_ma: DEFAULT_VOLUME_MA,
            obv_ma: DEFAULT_OBV_MA,
            max_box_width: 0.06,
            quiet_box_width: 0.015,
            divergence_memory: 10,
            cooldown: 15,
            accumulation_cooldown: 25,
        }
    }
}

/// Volume-flow entry and exit signals built on OBV.
///
/// Every bar is measured against the `range` bars before it. In order:
///
/// * [`SignalKind::FakeBreakout`]: close above resistance while OBV stays
///   under its range high.
/// * [`SignalKind::StopLoss`]: low breaks the low of the last entry bar, or
///   the close drops under the trend MA with OBV under its MA.
/// * [`SignalKind::Weakness`]: OBV falls through its MA while the close
///   holds above the trend MA.
/// * [`SignalKind::DivergenceEntry`]: shortly after price made a new low
///   against firm OBV, OBV climbs for three bars above its MA and breaks its
///   range high or makes a higher swing low, on active volume, above the
///   price MA, without a long lower shadow.
/// * [`SignalKind::Accumulation`]: OBV above its MA with a higher swing low
///   while price sits in a tight box.
///
/// Each kind has a cooldown. Signals are priced at the close.
///
/// # Errors
///
/// [`Error::MalformedSequence`] when open times do not strictly increase.
pub fn detect_obv_signals(
    bars: &[impl Ohlcv],
    config: &ObvStrategyConfig,
) -> Result<Vec<Signal>, Error> {
    validate_sequence(bars)?;
    Ok(scan(&obv_rows(bars, config), config))
}

#[derive(Debug, Clone, Copy, Default)]
struct ObvRow {
    time: Timestamp,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: f64,
    obv: f64,
    obv_ma: Option<f64>,
    price_ma: Option<Price>,
    trend_ma: Option<Price>,
    volume_ma: Option<f64>,
}

fn obv_rows(bars: &[impl Ohlcv], config: &ObvStrategyConfig) -> Vec<ObvRow> {
    let mut obv = Obv::new(ObvConfig::default());
    let mut obv_ma = Sma::new(SmaConfig::close(config.obv_ma));
    let mut price_ma = Sma::new(SmaConfig::close(config.price_ma));
    let mut trend_ma = Sma::new(SmaConfig::close(config.trend_ma));
    let mut volume_ma = Sma::new(SmaConfig::volume(config.volume_ma));

    bars.iter()
        .filter_map(|bar| {
            let value = obv.compute(bar)?;
            Some(ObvRow {
                time: bar.open_time(),
                open: bar.open(),
                high: bar.high(),
                low: bar.low(),
                close: bar.close(),
                volume: bar.volume(),
                obv: value,
                obv_ma: obv_ma
                    .compute(&Sample::new(bar.open_time(), value))
                    .map(|v| v.average()),
                price_ma: price_ma.compute(bar).map(|v| v.average()),
                trend_ma: trend_ma.compute(bar).map(|v| v.average()),
                volume_ma: volume_ma.compute(bar).map(|v| v.average()),
            })
        })
        .collect()
}

fn highest(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

fn lowest(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

/// Nearest `i` below `end − 1` and within `limit` of `end` whose value is
/// strictly under both neighbours.
fn swing_low(values: &[f64], end: usize, limit: usize) -> Option<usize> {
    let newest = end.checked_sub(2)?;
    let oldest = 2.max((end + 1).saturating_sub(limit));
    (oldest..=newest)
        .rev()
        .find(|&i| values[i] < values[i - 1] && values[i] < values[i + 1])
}

fn obv_higher_low(obv: &[f64], index: usize) -> bool {
    swing_low(obv, index, 10).is_some_and(|current| {
        swing_low(obv, current, 30).is_some_and(|previous| obv[current] > obv[previous])
    })
}

#[derive(Debug, Default)]
struct Emitter {
    signals: Vec<Signal>,
    last: HashMap<SignalKind, usize>,
}

impl Emitter {
    /// Records a signal unless its kind fired within `cooldown` bars.
    fn fire(
        &mut self,
        index: usize,
        row: &ObvRow,
        kind: SignalKind,
        cooldown: usize,
        reason: &str,
    ) -> bool {
        if self.last.get(&kind).is_some_and(|&last| index - last <= cooldown) {
            return false;
        }
        debug!(time = row.time, %kind, reason, "obv signal");
        self.signals.push(Signal::new(row.time, kind, row.close, reason));
        self.last.insert(kind, index);
        true
    }
}

#[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
fn scan(rows: &[ObvRow], config: &ObvStrategyConfig) -> Vec<Signal> {
    let range = config.range.max(1);
    let start = config.min_bars.max(range).max(3);
    let obv: Vec<f64> = rows.iter().map(|row| row.obv).collect();

    let mut out = Emitter::default();
    let mut entry_low: Option<Price> = None;
    let mut divergence_left = 0;

    for i in start..rows.len() {
        let (before, prev, cur) = (&rows[i - 2], &rows[i - 1], &rows[i]);
        let window = &rows[i - range..i];

        let resistance = highest(window.iter().map(|row| row.high));
        let support = lowest(window.iter().map(|row| row.low));
        let obv_high = highest(window.iter().map(|row| row.obv));
        let obv_low = lowest(window.iter().map(|row| row.obv));
        let average_close = window.iter().map(|row| row.close).sum::<f64>() / range as f64;
        let box_width = (resistance - support) / average_close;

        if box_width < config.quiet_box_width
            && cur.volume_ma.is_some_and(|ma| cur.volume < ma * 0.5)
        {
            continue;
        }

        if cur.close > resistance && cur.obv < obv_high {
            out.fire(
                i,
                cur,
                SignalKind::FakeBreakout,
                config.cooldown,
                "breakout without OBV behind it",
            );
        }

        let obv_under_ma = cur.obv_ma.is_some_and(|ma| cur.obv < ma);

        if entry_low.is_some_and(|low| cur.low < low) {
            if out.fire(
                i,
                cur,
                SignalKind::StopLoss,
                config.cooldown,
                "stop loss: broke the entry bar's low",
            ) {
                entry_low = None;
            }
        } else if cur.trend_ma.is_some_and(|ma| cur.close < ma) && obv_under_ma {
            if out.fire(
                i,
                cur,
                SignalKind::StopLoss,
                config.cooldown,
                "trend reversal: close under the trend MA with OBV under its MA",
            ) {
                entry_low = None;
            }
        } else if cur.trend_ma.is_some_and(|ma| cur.close > ma)
            && obv_under_ma
            && prev.obv >= prev.obv_ma.unwrap_or(0.0)
        {
            out.fire(
                i,
                cur,
                SignalKind::Weakness,
                config.cooldown,
                "OBV fell through its MA",
            );
        }

        if (cur.close < support || cur.close < prev.low) && cur.obv > obv_low {
            divergence_left = config.divergence_memory;
        } else {
            divergence_left = divergence_left.saturating_sub(1);
        }

        let recent_volume = (cur.volume + prev.volume + before.volume) / 3.0;
        let volume_active = cur.volume_ma.is_some_and(|ma| recent_volume > ma * 1.2);
        let above_price_ma = cur.price_ma.is_some_and(|ma| cur.close > ma);
        let obv_climbing = obv[i] > obv[i - 1]
            && obv[i - 1] > obv[i - 2]
            && obv[i - 2] > obv[i - 3]
            && cur.obv_ma.is_some_and(|ma| cur.obv > ma);

        if divergence_left > 0 && above_price_ma && volume_active && obv_climbing {
            let confirmed = cur.obv > obv_high || obv_higher_low(&obv, i);
            let lower_shadow = cur.open.min(cur.close) - cur.low;
            let solid = (cur.open - cur.close).abs() > lower_shadow * 0.5;

            if confirmed
                && solid
                && out.fire(
                    i,
                    cur,
                    SignalKind::DivergenceEntry,
                    config.cooldown,
                    "entry: OBV divergence confirmed by trend",
                )
            {
                entry_low = Some(cur.low);
            }
        }

        if box_width < config.max_box_width
            && cur.close < resistance
            && cur.obv_ma.is_some_and(|ma| cur.obv > ma)
            && obv_higher_low(&obv, i)
        {
            out.fire(
                i,
                cur,
                SignalKind::Accumulation,
                config.accumulation_cooldown,
                "accumulation: OBV higher low inside a tight range",
            );
        }
    }

    out.signals
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn config() -> ObvStrategyConfig {
        ObvStrategyConfig {
            min_bars: 3,
            range: 3,
            ..ObvStrategyConfig::default()
        }
    }

    /// Quiet bar in a 99..101 range.
    fn row(time: Timestamp, obv: f64) -> ObvRow {
        ObvRow {
            time,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 100.0,
            obv,
            ..ObvRow::default()
        }
    }

    fn kinds(signals: &[Signal]) -> Vec<SignalKind> {
        signals.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn too_few_rows() {
        let rows = [row(0, 1.0), row(1, 2.0), row(2, 3.0)];
        assert!(scan(&rows, &config()).is_empty());
    }

    mod swing_lows {
        use super::*;

        #[test]
        fn nearest_dip_before_the_last_two_bars() {
            let obv = [5.0, 4.0, 6.0, 3.0, 7.0, 8.0, 9.0];
            assert_eq!(swing_low(&obv, 6, 10), Some(3));
            assert_eq!(swing_low(&obv, 3, 30), None);
        }

        #[test]
        fn higher_low_needs_two_dips() {
            let rising = [100.0, 120.0, 90.0, 130.0, 110.0, 140.0, 150.0];
            assert!(obv_higher_low(&rising, 6));

            let falling = [100.0, 120.0, 110.0, 130.0, 90.0, 140.0, 150.0];
            assert!(!obv_higher_low(&falling, 6));
        }
    }

    mod breakout {
        use super::*;

        fn breakout(time: Timestamp, close: f64) -> ObvRow {
            ObvRow {
                close,
                high: close + 1.0,
                ..row(time, 900.0)
            }
        }

        #[test]
        fn close_over_resistance_without_obv() {
            let rows = [row(0, 1000.0), row(1, 950.0), row(2, 980.0), breakout(3, 105.0)];

            let signals = scan(&rows, &config());

            assert_eq!(kinds(&signals), [SignalKind::FakeBreakout]);
            assert_eq!(signals[0].time, 3);
            assert_eq!(signals[0].price, 105.0);
        }

        #[test]
        fn obv_confirming_the_break_is_quiet() {
            let rows = [
                row(0, 1000.0),
                row(1, 950.0),
                row(2, 980.0),
                ObvRow {
                    obv: 1200.0,
                    ..breakout(3, 105.0)
                },
            ];
            assert!(scan(&rows, &config()).is_empty());
        }

        #[test]
        fn cooldown_suppresses_repeats() {
            let rows = [
                row(0, 1000.0),
                row(1, 950.0),
                row(2, 980.0),
                breakout(3, 105.0),
                breakout(4, 110.0),
            ];

            assert_eq!(scan(&rows, &config()).len(), 1);

            let eager = ObvStrategyConfig {
                cooldown: 0,
                ..config()
            };
            assert_eq!(scan(&rows, &eager).len(), 2);
        }

        #[test]
        fn quiet_tight_range_is_skipped() {
            let tight = |time| ObvRow {
                high: 100.5,
                low: 100.0,
                close: 100.2,
                ..row(time, 1000.0)
            };
            let thin = |volume| ObvRow {
                close: 101.0,
                volume,
                volume_ma: Some(100.0),
                ..row(3, 900.0)
            };

            let rows = [tight(0), tight(1), tight(2), thin(40.0)];
            assert!(scan(&rows, &config()).is_empty());

            let rows = [tight(0), tight(1), tight(2), thin(60.0)];
            assert_eq!(kinds(&scan(&rows, &config())), [SignalKind::FakeBreakout]);
        }
    }

    mod entry {
        use super::*;

        /// Rows 0..=2 quiet, row 3 closes under support, row 4 is the entry
        /// bar, row 5 breaks the entry low.
        fn setup(dip_close: f64) -> Vec<ObvRow> {
            vec![
                row(0, 100.0),
                row(1, 110.0),
                row(2, 120.0),
                ObvRow {
                    open: 99.0,
                    high: 100.0,
                    low: 97.0,
                    close: dip_close,
                    ..row(3, 130.0)
                },
                ObvRow {
                    open: 99.0,
                    high: 103.0,
                    low: 99.0,
                    close: 102.0,
                    volume: 300.0,
                    obv_ma: Some(120.0),
                    price_ma: Some(100.0),
                    volume_ma: Some(100.0),
                    ..row(4, 140.0)
                },
                ObvRow {
                    low: 98.0,
                    close: 99.0,
                    obv_ma: Some(125.0),
                    ..row(5, 135.0)
                },
            ]
        }

        #[test]
        fn divergence_then_stop_loss_under_the_entry_low() {
            let signals = scan(&setup(98.0), &config());

            assert_eq!(
                kinds(&signals),
                [SignalKind::DivergenceEntry, SignalKind::StopLoss]
            );
            assert_eq!((signals[0].time, signals[0].price), (4, 102.0));
            assert_eq!((signals[1].time, signals[1].price), (5, 99.0));
            assert!(signals[1].description.contains("entry bar's low"));
        }

        #[test]
        fn needs_a_recent_price_low() {
            assert!(scan(&setup(99.5), &config()).is_empty());
        }

        #[test]
        fn long_lower_shadow_blocks_the_entry() {
            let mut rows = setup(98.0);
            rows[4].open = 102.5;
            rows[4].low = 97.5;

            assert!(
                scan(&rows, &config())
                    .iter()
                    .all(|s| s.kind != SignalKind::DivergenceEntry)
            );
        }
    }

    mod exits {
        use super::*;

        fn trending(time: Timestamp) -> ObvRow {
            ObvRow {
                obv_ma: Some(90.0),
                trend_ma: Some(90.0),
                ..row(time, 100.0)
            }
        }

        #[test]
        fn obv_through_its_ma_above_trend_is_weakness() {
            let rows = [
                trending(0),
                trending(1),
                trending(2),
                ObvRow {
                    obv: 80.0,
                    obv_ma: Some(95.0),
                    ..trending(3)
                },
            ];

            let signals = scan(&rows, &config());

            assert_eq!(kinds(&signals), [SignalKind::Weakness]);
        }

        #[test]
        fn close_under_trend_is_a_reversal_stop() {
            let rows = [
                trending(0),
                trending(1),
                trending(2),
                ObvRow {
                    obv: 80.0,
                    obv_ma: Some(95.0),
                    low: 84.0,
                    close: 85.0,
                    ..trending(3)
                },
            ];

            let signals = scan(&rows, &config());

            assert_eq!(kinds(&signals), [SignalKind::StopLoss]);
            assert!(signals[0].description.starts_with("trend reversal"));
        }
    }

    #[test]
    fn accumulation_on_a_higher_obv_low() {
        let obv = [100.0, 120.0, 90.0, 130.0, 110.0, 140.0, 150.0];
        let mut rows: Vec<_> = obv.iter().zip(0..).map(|(&v, t)| row(t, v)).collect();
        rows[6].obv_ma = Some(120.0);

        let signals = scan(&rows, &config());

        assert_eq!(kinds(&signals), [SignalKind::Accumulation]);
        assert_eq!((signals[0].time, signals[0].price), (6, 100.0));
    }
}
