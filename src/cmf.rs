use std::{fmt::Display, num::NonZero};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Timestamp,
    indicator::debug_assert_advancing, ring_buffer::RollingSum,
};

/// Configuration for Chaikin Money Flow ([`Cmf`]).
///
/// ```
/// use barlens_ta::{CmfConfig, IndicatorConfig};
/// use std::num::NonZero;
///
/// let config = CmfConfig::new(NonZero::new(21).unwrap());
/// assert_eq!(config.required_bars(), 21);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct CmfConfig {
    length: usize,
}

impl IndicatorConfig for CmfConfig {
    type Builder = CmfConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        CmfConfigBuilder { length: None }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.length
    }
}

impl CmfConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Display for CmfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CmfConfig({})", self.length)
    }
}

/// Builder for [`CmfConfig`]. Length must be set.
pub struct CmfConfigBuilder {
    length: Option<usize>,
}

impl CmfConfigBuilder {
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }
}

impl IndicatorConfigBuilder<CmfConfig> for CmfConfigBuilder {
    #[inline]
    fn build(self) -> CmfConfig {
        CmfConfig {
            length: self.length.expect("length is required"),
        }
    }
}

/// Chaikin Money Flow (CMF).
///
/// Each bar contributes a money flow volume weighted by where the close sits
/// in the bar's range:
///
/// ```text
/// multiplier = (2 × close − low − high) / (high − low)    (0 when high == low)
/// mfv        = multiplier × volume
/// CMF        = Σ mfv / Σ volume                            (0 when Σ volume == 0)
/// ```
///
/// Output ranges from −1 to 1 and is `None` until the window holds
/// `length` bars.
#[derive(Clone, Debug)]
pub struct Cmf {
    config: CmfConfig,
    flow: RollingSum,
    volume: RollingSum,
    current: Option<f64>,
    last_open_time: Option<Timestamp>,
}

impl Indicator for Cmf {
    type Config = CmfConfig;
    type Output = f64;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            flow: RollingSum::new(config.length),
            volume: RollingSum::new(config.length),
            current: None,
            last_open_time: None,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<f64> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let range = ohlcv.high() - ohlcv.low();
        let multiplier = if range > 0.0 {
            (2.0 * ohlcv.close() - ohlcv.low() - ohlcv.high()) / range
        } else {
            0.0
        };

        self.flow.push(multiplier * ohlcv.volume());
        self.volume.push(ohlcv.volume());

        self.current = match (self.flow.sum(), self.volume.sum()) {
            (Some(_), Some(volume)) if volume == 0.0 => Some(0.0),
            (Some(flow), Some(volume)) => Some(flow / volume),
            _ => None,
        };

        self.current
    }

    #[inline]
    fn value(&self) -> Option<f64> {
        self.current
    }
}

impl Display for Cmf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CMF({})", self.config.length)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_util::{Bar, assert_approx, hlc, nz};

    fn cmf(length: usize) -> Cmf {
        Cmf::new(CmfConfig::new(nz(length)))
    }

    mod filling {
        use super::*;

        #[test]
        fn none_until_window_full() {
            let mut cmf = cmf(3);
            assert_eq!(cmf.compute(&hlc(12.0, 8.0, 10.0, 1).with_volume(10.0)), None);
            assert_eq!(cmf.compute(&hlc(12.0, 8.0, 10.0, 2).with_volume(10.0)), None);
            assert!(
                cmf.compute(&hlc(12.0, 8.0, 10.0, 3).with_volume(10.0))
                    .is_some()
            );
        }
    }

    mod computation {
        use super::*;

        #[test]
        fn close_at_high_is_one() {
            let mut cmf = cmf(2);
            cmf.compute(&hlc(12.0, 8.0, 12.0, 1).with_volume(100.0));
            assert_eq!(
                cmf.compute(&hlc(14.0, 9.0, 14.0, 2).with_volume(50.0)),
                Some(1.0)
            );
        }

        #[test]
        fn weights_by_volume() {
            let mut cmf = cmf(2);
            // close at high: mfv = +300
            cmf.compute(&hlc(12.0, 8.0, 12.0, 1).with_volume(300.0));
            // close at low: mfv = −100
            let v = cmf.compute(&hlc(12.0, 8.0, 8.0, 2).with_volume(100.0)).unwrap();
            // (300 − 100) / 400 = 0.5
            assert_approx!(v, 0.5);
        }

        #[test]
        fn slides_window() {
            let mut cmf = cmf(2);
            cmf.compute(&hlc(12.0, 8.0, 12.0, 1).with_volume(300.0));
            cmf.compute(&hlc(12.0, 8.0, 8.0, 2).with_volume(100.0));
            // mid-range close: multiplier 0 → (−100 + 0) / 200
            let v = cmf.compute(&hlc(12.0, 8.0, 10.0, 3).with_volume(100.0)).unwrap();
            assert_approx!(v, -0.5);
        }
    }

    mod degenerate {
        use super::*;

        #[test]
        fn zero_range_bar_contributes_nothing() {
            let mut cmf = cmf(2);
            cmf.compute(&Bar::new(10.0, 10.0, 10.0, 10.0).at(1).with_volume(500.0));
            assert_eq!(
                cmf.compute(&Bar::new(10.0, 10.0, 10.0, 10.0).at(2).with_volume(500.0)),
                Some(0.0)
            );
        }

        #[test]
        fn zero_volume_is_zero() {
            let mut cmf = cmf(2);
            cmf.compute(&hlc(12.0, 8.0, 12.0, 1));
            assert_eq!(cmf.compute(&hlc(12.0, 8.0, 8.0, 2)), Some(0.0));
        }

        #[test]
        fn zero_volume_after_activity_is_zero() {
            let mut cmf = cmf(2);
            cmf.compute(&hlc(12.0, 8.0, 12.0, 1).with_volume(0.3));
            cmf.compute(&hlc(12.0, 8.0, 8.0, 2).with_volume(0.1));
            cmf.compute(&hlc(12.0, 8.0, 12.0, 3));
            let v = cmf.compute(&hlc(12.0, 8.0, 8.0, 4)).unwrap();
            assert_eq!(v, 0.0);
            assert!(v.is_finite());
        }
    }

    #[test]
    fn display() {
        assert_eq!(cmf(21).to_string(), "CMF(21)");
    }
}
