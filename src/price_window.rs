use crate::{Ohlcv, Price, PriceSource, Timestamp, indicator::debug_assert_advancing};
use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub(crate) struct PriceWindow<const SUM_OF_SQUARES: bool = false> {
    size: usize,
    /// Samples in arrival order, tagged with the bar they came from.
    window: VecDeque<(Timestamp, Price)>,
    /// Updated on every add and evict rather than re-summed.
    sum: Price,
    sum_of_squares: f64,
    /// Close of the previous bar, for `TrueRange` extraction.
    prev_close: Option<Price>,
    source: PriceSource,
    last_open_time: Option<Timestamp>,
}

pub(crate) type PriceWindowWithSumOfSquares = PriceWindow<true>;

impl PriceWindow {
    pub fn new(size: usize, source: PriceSource) -> Self {
        Self::with_capacity(size, source)
    }
}

impl PriceWindow<true> {
    pub fn with_sum_of_squares(size: usize, source: PriceSource) -> Self {
        Self::with_capacity(size, source)
    }
}

impl<const SUM_OF_SQUARES: bool> PriceWindow<SUM_OF_SQUARES> {
    fn with_capacity(size: usize, source: PriceSource) -> Self {
        Self {
            size,
            source,
            sum: 0.0,
            sum_of_squares: 0.0,
            prev_close: None,
            window: VecDeque::with_capacity(size + 1),
            last_open_time: None,
        }
    }

    /// Appends the bar's configured price, evicting the oldest sample once
    /// the window is full.
    #[inline]
    pub fn add(&mut self, ohlcv: &impl Ohlcv) {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let price = self.source.extract(ohlcv, self.prev_close);
        self.prev_close = Some(ohlcv.close());

        self.window.push_back((ohlcv.open_time(), price));
        self.sum += price;
        if SUM_OF_SQUARES {
            self.sum_of_squares += price * price;
        }

        if self.window.len() > self.size
            && let Some((_, old_price)) = self.window.pop_front()
        {
            self.sum -= old_price;
            if SUM_OF_SQUARES {
                self.sum_of_squares -= old_price * old_price;
            }
        }
    }

    #[inline]
    pub fn sum(&self) -> Option<Price> {
        self.is_ready().then_some(self.sum)
    }

    #[inline]
    pub fn sum_of_squares(&self) -> Option<Price> {
        assert!(SUM_OF_SQUARES, "sum_of_squares requires PriceWindow<true>");
        self.is_ready().then_some(self.sum_of_squares)
    }

    /// The sample the next `add` will evict, once the window is full.
    #[inline]
    pub fn oldest(&self) -> Option<(Timestamp, Price)> {
        if self.is_ready() {
            self.window.front().copied()
        } else {
            None
        }
    }

    #[inline]
    fn is_ready(&self) -> bool {
        self.window.len() == self.size
    }
}
