//! Streaming technical indicators and chart signal detection for OHLCV bar
//! series.
//!
//! Indicators accept any type implementing [`Ohlcv`] and return typed
//! results. A value is `None` until the indicator has seen enough bars;
//! `None` never stands in for zero.
//!
//! Each indicator type ([`Sma`], [`Ema`], [`Rsi`], [`Kd`], ...) exposes
//! [`new`](Sma::new), [`compute`](Sma::compute), and [`value`](Sma::value)
//! as inherent methods, so no trait import is needed. Import [`Indicator`]
//! only for generic code.
//!
//! [`Pipeline`] and [`compute_indicators`] run a configured set of
//! indicators over a bar series and produce one [`EnrichedRow`] per bar.
//! The detectors ([`detect_crosses`], [`detect_divergence`],
//! [`detect_gaps`], [`detect_cloud_signals`], [`detect_obv_signals`]) turn
//! series into [`Signal`]s and [`Gap`]s.
//!
//! ```
//! use barlens_ta::{Bar, PipelineConfig, compute_indicators};
//!
//! let bars: Vec<_> = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0]
//!     .into_iter()
//!     .zip(1..)
//!     .map(|(c, t)| Bar::new(t, c, c, c, c, 100.0))
//!     .collect();
//!
//! let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();
//! assert_eq!(rows[3].ma(5), None);
//! assert_eq!(rows[4].ma(5).unwrap().average(), 12.0);
//! assert_eq!(rows[5].ma(5).unwrap().average(), 13.0);
//! ```

mod bb;
mod cloud;
mod cmf;
mod config;
mod cross;
mod divergence;
mod dmi;
mod ema;
mod error;
mod extremum_window;
mod gap;
pub mod ichimoku;
mod indicator;
mod kd;
mod macd;
mod mfi;
mod obv;
mod obv_strategy;
mod ohlcv;
mod pipeline;
mod price_source;
mod price_window;
mod ring_buffer;
mod row;
mod rsi;
mod signal;
mod sma;
mod wilder;

pub use crate::error::Error;
pub use crate::indicator::{Indicator, IndicatorConfig, IndicatorConfigBuilder};
pub use crate::ohlcv::{Bar, Ohlcv, Price, Sample, Timestamp};
pub use crate::price_source::PriceSource;

pub use crate::bb::{Bb, BbConfig, BbConfigBuilder, BbValue, StdDev};
pub use crate::cmf::{Cmf, CmfConfig, CmfConfigBuilder};
pub use crate::dmi::{Dmi, DmiConfig, DmiConfigBuilder, DmiValue};
pub use crate::ema::{Ema, EmaConfig, EmaConfigBuilder};
pub use crate::ichimoku::{
    Ichimoku, IchimokuConfig, IchimokuConfigBuilder, IchimokuDisplayRow, IchimokuValue,
};
pub use crate::kd::{Kd, KdConfig, KdConfigBuilder, KdValue};
pub use crate::macd::{Macd, MacdConfig, MacdConfigBuilder, MacdValue};
pub use crate::mfi::{Mfi, MfiConfig, MfiConfigBuilder};
pub use crate::obv::{Obv, ObvConfig, ObvConfigBuilder};
pub use crate::rsi::{Rsi, RsiConfig, RsiConfigBuilder};
pub use crate::sma::{Sma, SmaConfig, SmaConfigBuilder, SmaValue};

pub use crate::cloud::{CloudConfig, detect_cloud_signals};
pub use crate::cross::{Cross, CrossDetector, crossover, detect_crosses};
pub use crate::divergence::{
    DivergenceConfig, LocalExtremumConfig, detect_cross_interval_divergence, detect_divergence,
    detect_local_extremum_divergence,
};
pub use crate::gap::{
    Gap, GapConfig, GapFill, GapKind, GapStatistics, annotate_fills, detect_gaps,
    detect_gaps_with, gap_fill, recent_gaps, sort_by_size,
};
pub use crate::obv_strategy::{ObvStrategyConfig, detect_obv_signals};
pub use crate::signal::{Signal, SignalKind};

pub use crate::config::{IchimokuLengths, MacdLengths, PipelineConfig};
pub use crate::pipeline::{Pipeline, compute_indicators, validate_sequence};
pub use crate::row::{EnrichedRow, Trend};

macro_rules! impl_indicator_methods {
    ($type:ty, $config:ty, $output:ty) => {
        impl $type {
            /// See [`Indicator::new`].
            #[must_use]
            pub fn new(config: $config) -> Self {
                <Self as Indicator>::new(config)
            }

            /// See [`Indicator::compute`].
            #[inline]
            pub fn compute(&mut self, kline: &impl Ohlcv) -> Option<$output> {
                <Self as Indicator>::compute(self, kline)
            }

            /// See [`Indicator::value`].
            #[must_use]
            #[inline]
            pub fn value(&self) -> Option<$output> {
                <Self as Indicator>::value(self)
            }
        }
    };
}

impl_indicator_methods!(Sma, SmaConfig, SmaValue);
impl_indicator_methods!(Ema, EmaConfig, Price);
impl_indicator_methods!(Rsi, RsiConfig, f64);
impl_indicator_methods!(Bb, BbConfig, BbValue);
impl_indicator_methods!(Macd, MacdConfig, MacdValue);
impl_indicator_methods!(Kd, KdConfig, KdValue);
impl_indicator_methods!(Obv, ObvConfig, f64);
impl_indicator_methods!(Cmf, CmfConfig, f64);
impl_indicator_methods!(Mfi, MfiConfig, f64);
impl_indicator_methods!(Dmi, DmiConfig, DmiValue);
impl_indicator_methods!(Ichimoku, IchimokuConfig, IchimokuValue);

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod inherent_methods {
    use super::{
        Bb, BbConfig, BbValue, Ema, EmaConfig, Kd, KdConfig, Ohlcv, Price, Rsi, RsiConfig, Sma,
        SmaConfig, Timestamp,
    };
    use std::num::NonZero;

    struct Bar(f64, u64);
    impl Ohlcv for Bar {
        fn open(&self) -> Price {
            self.0
        }
        fn high(&self) -> Price {
            self.0
        }
        fn low(&self) -> Price {
            self.0
        }
        fn close(&self) -> Price {
            self.0
        }
        fn open_time(&self) -> Timestamp {
            self.1
        }
    }

    #[test]
    fn sma_without_indicator_import() {
        let mut sma = Sma::new(SmaConfig::close(NonZero::new(2).unwrap()));
        assert_eq!(sma.compute(&Bar(10.0, 1)), None);
        assert_eq!(sma.compute(&Bar(20.0, 2)).map(|v| v.average()), Some(15.0));
        assert_eq!(sma.value().map(|v| v.average()), Some(15.0));
    }

    #[test]
    fn ema_without_indicator_import() {
        let mut ema = Ema::new(EmaConfig::close(NonZero::new(2).unwrap()));
        assert_eq!(ema.compute(&Bar(10.0, 1)), Some(10.0));
        assert!(ema.compute(&Bar(20.0, 2)).is_some());
        assert!(ema.value().is_some());
    }

    #[test]
    fn rsi_without_indicator_import() {
        let mut rsi = Rsi::new(RsiConfig::close(NonZero::new(2).unwrap()));
        assert_eq!(rsi.compute(&Bar(10.0, 1)), None);
        assert_eq!(rsi.compute(&Bar(11.0, 2)), None);
        assert_eq!(rsi.compute(&Bar(12.0, 3)), Some(100.0));
    }

    #[test]
    fn kd_without_indicator_import() {
        let mut kd = Kd::new(KdConfig::new(NonZero::new(1).unwrap()));
        assert!(kd.compute(&Bar(10.0, 1)).is_some());
        assert!(kd.value().is_some());
    }

    #[test]
    fn bb_without_indicator_import() {
        let mut bb = Bb::new(BbConfig::close(NonZero::new(2).unwrap()));
        assert!(bb.compute(&Bar(10.0, 1)).is_none());
        let v: Option<BbValue> = bb.compute(&Bar(20.0, 2));
        assert!(v.is_some());
        assert!(bb.value().is_some());
    }
}
