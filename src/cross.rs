use serde::Serialize;

use crate::{Error, Signal, SignalKind, Timestamp};

/// Direction of a crossing between two aligned series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Cross {
    /// A moved from at-or-below B to above B.
    Golden,
    /// A moved from at-or-above B to below B.
    Death,
}

impl From<Cross> for SignalKind {
    fn from(cross: Cross) -> Self {
        match cross {
            Cross::Golden => SignalKind::GoldenCross,
            Cross::Death => SignalKind::DeathCross,
        }
    }
}

/// Classifies the move from `(prev_a, prev_b)` to `(a, b)`.
///
/// ```
/// use barlens_ta::{Cross, crossover};
///
/// assert_eq!(crossover(1.0, 2.0, 3.0, 2.0), Some(Cross::Golden));
/// assert_eq!(crossover(2.0, 2.0, 1.0, 2.0), Some(Cross::Death));
/// assert_eq!(crossover(3.0, 2.0, 4.0, 2.0), None);
/// ```
#[inline]
#[must_use]
pub fn crossover(prev_a: f64, prev_b: f64, a: f64, b: f64) -> Option<Cross> {
    if prev_a <= prev_b && a > b {
        Some(Cross::Golden)
    } else if prev_a >= prev_b && a < b {
        Some(Cross::Death)
    } else {
        None
    }
}

/// Streaming cross detection over two series that may be unavailable.
///
/// A cross needs both series defined on both the previous and the current
/// step. An undefined value clears the history, so a series that just became
/// available never produces a cross on its first step.
#[derive(Debug, Clone, Default)]
pub struct CrossDetector {
    prev: Option<(f64, f64)>,
}

impl CrossDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next pair and reports a cross against the previous pair.
    #[inline]
    pub fn update(&mut self, a: Option<f64>, b: Option<f64>) -> Option<Cross> {
        let Some((a, b)) = a.zip(b) else {
            self.prev = None;
            return None;
        };

        self.prev
            .replace((a, b))
            .and_then(|(prev_a, prev_b)| crossover(prev_a, prev_b, a, b))
    }
}

/// Emits a signal for every cross of `a` over `b`.
///
/// The signal is priced at `a`'s value on the crossing bar.
///
/// # Errors
///
/// [`Error::SeriesLengthMismatch`] when `a` or `b` is not aligned with `times`.
pub fn detect_crosses(
    times: &[Timestamp],
    a: &[Option<f64>],
    b: &[Option<f64>],
) -> Result<Vec<Signal>, Error> {
    for series in [a, b] {
        if series.len() != times.len() {
            return Err(Error::SeriesLengthMismatch {
                expected: times.len(),
                actual: series.len(),
            });
        }
    }

    let mut detector = CrossDetector::new();

    Ok(times
        .iter()
        .zip(a.iter().zip(b))
        .filter_map(|(&time, (&a, &b))| {
            let cross = detector.update(a, b)?;
            let price = a?;
            let description = match cross {
                Cross::Golden => "crossed above",
                Cross::Death => "crossed below",
            };
            Some(Signal::new(time, cross.into(), price, description))
        })
        .collect())
}
