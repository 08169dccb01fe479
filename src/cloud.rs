use tracing::debug;

use crate::{
    EnrichedRow, Price, Signal, SignalKind, Timestamp,
    ichimoku::{self, DISPLACEMENT, IchimokuDisplayRow},
};

/// Parameters for [`detect_cloud_signals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudConfig {
    /// Bars the cloud is shifted forward for display.
    pub displacement: usize,
    /// Rows needed before any signal; the first candidate is this index.
    pub min_rows: usize,
    /// A cloud is thick when `|senkou_a − senkou_b| > close × thick_cloud_ratio`.
    pub thick_cloud_ratio: f64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            displacement: DISPLACEMENT,
            min_rows: 52,
            thick_cloud_ratio: 0.005,
        }
    }
}

/// Cloud-and-money-flow entry and exit signals.
///
/// Reads the Ichimoku lines, CMF and CMF-EMA of every row, with the cloud
/// shifted the way it is charted. While flat it looks for:
///
/// * [`SignalKind::Buy`]: close above the cloud, tenkan above a flat or
///   rising kijun, CMF positive with a rising CMF-EMA. Switches to holding.
/// * [`SignalKind::Accumulation`]: close in or below the cloud while CMF is
///   above −0.05 and its EMA rises, reported on the first bar of a run.
/// * [`SignalKind::FakeBreakout`]: close breaks above the cloud while CMF is
///   not positive.
///
/// While holding it reports [`SignalKind::Weakness`] on a new high with
/// fading money flow, and [`SignalKind::Exit`] (back to flat) on a kijun
/// break, a close below the cloud, a bearish TK cross with negative CMF, or
/// CMF below −0.05.
///
/// Returns nothing when rows lack Ichimoku values or there are fewer than
/// `min_rows` of them.
#[must_use]
pub fn detect_cloud_signals(rows: &[EnrichedRow], config: &CloudConfig) -> Vec<Signal> {
    let Some(values) = rows
        .iter()
        .map(|row| row.ichimoku.map(|value| (row.bar.t, value)))
        .collect::<Option<Vec<_>>>()
    else {
        debug!("cloud signals need ichimoku on every row");
        return Vec::new();
    };

    let display = ichimoku::display_rows(&values, config.displacement);
    let cloud_rows: Vec<_> = rows
        .iter()
        .zip(display)
        .map(|(row, display)| CloudRow::new(row, &display))
        .collect();

    scan(&cloud_rows, config)
}

/// Everything the strategy reads from one bar.
#[derive(Debug, Clone, Copy, Default)]
struct CloudRow {
    time: Timestamp,
    high: Price,
    low: Price,
    close: Price,
    tenkan: Option<Price>,
    kijun: Option<Price>,
    senkou_a: Option<Price>,
    senkou_b: Option<Price>,
    cmf: Option<f64>,
    cmf_ema: Option<f64>,
}

impl CloudRow {
    fn new(row: &EnrichedRow, display: &IchimokuDisplayRow) -> Self {
        Self {
            time: row.bar.t,
            high: row.bar.h,
            low: row.bar.l,
            close: row.bar.c,
            tenkan: display.tenkan,
            kijun: display.kijun,
            senkou_a: display.senkou_a,
            senkou_b: display.senkou_b,
            cmf: row.cmf,
            cmf_ema: row.cmf_ema,
        }
    }

    fn cloud_top(&self) -> Option<Price> {
        self.senkou_a.zip(self.senkou_b).map(|(a, b)| a.max(b))
    }

    fn cloud_bottom(&self) -> Option<Price> {
        self.senkou_a.zip(self.senkou_b).map(|(a, b)| a.min(b))
    }

    fn above_cloud(&self) -> bool {
        self.cloud_top().is_some_and(|top| self.close > top)
    }

    fn below_cloud(&self) -> bool {
        self.cloud_bottom().is_some_and(|bottom| self.close < bottom)
    }

    fn in_cloud(&self) -> bool {
        self.cloud_top().zip(self.cloud_bottom()).is_some_and(|(top, bottom)| {
            self.close <= top && self.close >= bottom
        })
    }

    /// Has a cloud and did not close above it.
    fn not_above_cloud(&self) -> bool {
        self.cloud_top().is_some_and(|top| self.close <= top)
    }

    fn thick_cloud(&self, ratio: f64) -> bool {
        self.senkou_a
            .zip(self.senkou_b)
            .is_some_and(|(a, b)| (a - b).abs() > self.close * ratio)
    }

    fn cmf_above(&self, level: f64) -> bool {
        self.cmf.is_some_and(|cmf| cmf > level)
    }

    fn cmf_below(&self, level: f64) -> bool {
        self.cmf.is_some_and(|cmf| cmf < level)
    }

    fn tk(&self) -> Option<(Price, Price)> {
        self.tenkan.zip(self.kijun)
    }
}

fn rising(prev: Option<f64>, cur: Option<f64>) -> bool {
    prev.zip(cur).is_some_and(|(prev, cur)| cur > prev)
}

fn falling(prev: Option<f64>, cur: Option<f64>) -> bool {
    prev.zip(cur).is_some_and(|(prev, cur)| cur < prev)
}

fn emit(signals: &mut Vec<Signal>, row: &CloudRow, kind: SignalKind, price: Price, reason: &str) {
    debug!(time = row.time, %kind, reason, "cloud signal");
    signals.push(Signal::new(row.time, kind, price, reason));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Flat,
    Holding,
}

fn scan(rows: &[CloudRow], config: &CloudConfig) -> Vec<Signal> {
    let mut signals = Vec::new();
    if rows.len() < config.min_rows {
        return signals;
    }

    let mut position = Position::Flat;

    for i in config.min_rows.max(2)..rows.len() {
        let (before, prev, cur) = (&rows[i - 2], &rows[i - 1], &rows[i]);
        let cmf_ema_up = rising(prev.cmf_ema, cur.cmf_ema);

        match position {
            Position::Flat => {
                let tk_bullish = cur.tk().is_some_and(|(tenkan, kijun)| tenkan > kijun);
                let kijun_stable = prev.kijun.zip(cur.kijun).is_some_and(|(p, c)| c >= p);

                let strong = cur.above_cloud()
                    && tk_bullish
                    && kijun_stable
                    && cur.cmf_above(0.0)
                    && cmf_ema_up;

                if strong {
                    let reason = if cur.thick_cloud(config.thick_cloud_ratio) {
                        "strong buy"
                    } else {
                        "strong buy on a thin cloud"
                    };
                    emit(&mut signals, cur, SignalKind::Buy, cur.low * 0.98, reason);
                    position = Position::Holding;
                }

                let accumulating = (cur.in_cloud() || cur.below_cloud())
                    && cur.cmf_above(-0.05)
                    && cmf_ema_up;
                let was_accumulating = prev.not_above_cloud()
                    && prev.cmf_above(-0.05)
                    && rising(before.cmf_ema, prev.cmf_ema);

                if accumulating && !was_accumulating {
                    emit(
                        &mut signals,
                        cur,
                        SignalKind::Accumulation,
                        cur.low * 0.99,
                        "accumulation",
                    );
                }

                if cur.above_cloud() && prev.not_above_cloud() && !cur.cmf_above(0.0) {
                    emit(
                        &mut signals,
                        cur,
                        SignalKind::FakeBreakout,
                        cur.high * 1.02,
                        "cloud break without money flow",
                    );
                }
            }
            Position::Holding => {
                let exhausted = cur.close > prev.high
                    && falling(prev.cmf_ema, cur.cmf_ema)
                    && falling(prev.cmf, cur.cmf);
                if exhausted {
                    emit(
                        &mut signals,
                        cur,
                        SignalKind::Weakness,
                        cur.high * 1.02,
                        "new high on fading money flow",
                    );
                }

                let tk_bearish = cur.tk().is_some_and(|(tenkan, kijun)| tenkan < kijun);
                let kijun_break = cur.kijun.is_some_and(|kijun| cur.close < kijun);

                // Later checks are more severe and name the exit
                let mut exit = None;
                if kijun_break && cur.cmf_below(0.05) {
                    exit = Some("kijun break");
                }
                if cur.below_cloud() {
                    exit = Some("close below the cloud");
                }
                if tk_bearish && cur.cmf_below(0.0) {
                    exit = Some("bearish TK cross with negative money flow");
                }
                if cur.cmf_below(-0.05) {
                    exit = Some("money flow stop");
                }

                if let Some(reason) = exit {
                    emit(&mut signals, cur, SignalKind::Exit, cur.high * 1.02, reason);
                    position = Position::Flat;
                }
            }
        }
    }

    signals
}
