use serde::{Deserialize, Serialize};

/// A price value.
///
/// Semantic alias for [`f64`]. Documents intent in function signatures
/// without introducing newtype construction overhead.
pub type Price = f64;

/// Bar open timestamp or sequence number.
///
/// Must be strictly increasing between consecutive calls to
/// [`Indicator::compute`](crate::Indicator::compute).
pub type Timestamp = u64;

/// OHLCV bar data used as input to all indicators.
///
/// Implement this on your own kline/candle type to avoid per-tick
/// conversion. Indicators accept `&impl Ohlcv` and extract the
/// configured [`PriceSource`](crate::PriceSource) internally.
///
/// # Example
///
/// ```
/// use barlens_ta::{Ohlcv, Price, Timestamp};
///
/// struct MyKline {
///     o: f64, h: f64, l: f64, c: f64, v: f64,
///     ts: u64,
/// }
///
/// impl Ohlcv for MyKline {
///     fn open(&self) -> Price { self.o }
///     fn high(&self) -> Price { self.h }
///     fn low(&self) -> Price { self.l }
///     fn close(&self) -> Price { self.c }
///     fn open_time(&self) -> Timestamp { self.ts }
///     fn volume(&self) -> f64 { self.v }
/// }
/// ```
pub trait Ohlcv {
    /// Opening price of the bar.
    fn open(&self) -> Price;

    /// Highest price during the bar.
    fn high(&self) -> Price;

    /// Lowest price during the bar.
    fn low(&self) -> Price;

    /// Closing price of the bar.
    fn close(&self) -> Price;

    /// Bar open timestamp or sequence number.
    ///
    /// Values must be strictly increasing between calls. Indicators do not
    /// validate this in release builds; [`Pipeline`](crate::Pipeline) does.
    fn open_time(&self) -> Timestamp;

    /// Trade volume during the bar. Defaults to `0.0`.
    ///
    /// Override this for volume-dependent indicators (OBV, MFI, CMF).
    fn volume(&self) -> f64 {
        0.0
    }
}

/// One OHLCV sample for a time bucket (hour, day, week).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub t: Timestamp,
    pub o: Price,
    pub h: Price,
    pub l: Price,
    pub c: Price,
    pub v: f64,
}

impl Bar {
    #[must_use]
    pub fn new(t: Timestamp, o: Price, h: Price, l: Price, c: Price, v: f64) -> Self {
        Self { t, o, h, l, c, v }
    }

    /// Copies any [`Ohlcv`] value into a plain `Bar`.
    #[must_use]
    pub fn from_ohlcv(ohlcv: &impl Ohlcv) -> Self {
        Self {
            t: ohlcv.open_time(),
            o: ohlcv.open(),
            h: ohlcv.high(),
            l: ohlcv.low(),
            c: ohlcv.close(),
            v: ohlcv.volume(),
        }
    }
}

impl Ohlcv for Bar {
    fn open(&self) -> Price {
        self.o
    }

    fn high(&self) -> Price {
        self.h
    }

    fn low(&self) -> Price {
        self.l
    }

    fn close(&self) -> Price {
        self.c
    }

    fn open_time(&self) -> Timestamp {
        self.t
    }

    fn volume(&self) -> f64 {
        self.v
    }
}

/// A single scalar observation presented as a flat bar.
///
/// All four prices equal `value` and volume is zero. Use it to run a price
/// indicator over another indicator's output, e.g. an EMA of OBV:
///
/// ```
/// use barlens_ta::{Ema, EmaConfig, Sample};
/// use std::num::NonZero;
///
/// let mut obv_ema = Ema::new(EmaConfig::close(NonZero::new(10).unwrap()));
/// assert_eq!(obv_ema.compute(&Sample::new(1, 1500.0)), Some(1500.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    time: Timestamp,
    value: f64,
}

impl Sample {
    #[must_use]
    pub fn new(time: Timestamp, value: f64) -> Self {
        Self { time, value }
    }
}

impl Ohlcv for Sample {
    fn open(&self) -> Price {
        self.value
    }

    fn high(&self) -> Price {
        self.value
    }

    fn low(&self) -> Price {
        self.value
    }

    fn close(&self) -> Price {
        self.value
    }

    fn open_time(&self) -> Timestamp {
        self.time
    }
}
