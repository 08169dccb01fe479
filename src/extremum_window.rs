use crate::Price;
use std::collections::VecDeque;

/// Rolling highest-high / lowest-low over the last `size` bars.
///
/// Each side is a monotonic deque of `(sequence, price)`: the front is the
/// current extremum, dominated entries are dropped on insert. Amortised O(1)
/// per bar, memory bounded by `size`.
#[derive(Clone, Debug)]
pub(crate) struct ExtremumWindow {
    size: usize,
    seen: usize,
    highs: VecDeque<(usize, Price)>,
    lows: VecDeque<(usize, Price)>,
}

impl ExtremumWindow {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size,
            seen: 0,
            highs: VecDeque::with_capacity(size),
            lows: VecDeque::with_capacity(size),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, high: Price, low: Price) {
        let seq = self.seen;

        while self.highs.back().is_some_and(|&(_, h)| h <= high) {
            self.highs.pop_back();
        }
        self.highs.push_back((seq, high));

        while self.lows.back().is_some_and(|&(_, l)| l >= low) {
            self.lows.pop_back();
        }
        self.lows.push_back((seq, low));

        while self.highs.front().is_some_and(|&(s, _)| s + self.size <= seq) {
            self.highs.pop_front();
        }
        while self.lows.front().is_some_and(|&(s, _)| s + self.size <= seq) {
            self.lows.pop_front();
        }

        self.seen += 1;
    }

    /// `(highest_high, lowest_low)` once `size` bars have been pushed.
    #[inline]
    pub(crate) fn range(&self) -> Option<(Price, Price)> {
        if self.seen < self.size {
            return None;
        }

        let (_, high) = self.highs.front()?;
        let (_, low) = self.lows.front()?;
        Some((*high, *low))
    }

    /// Midpoint of the range, the Ichimoku line formula.
    #[inline]
    pub(crate) fn midpoint(&self) -> Option<Price> {
        self.range().map(|(high, low)| f64::midpoint(high, low))
    }
}
