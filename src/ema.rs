use std::{
    fmt::{Debug, Display},
    num::NonZero,
};

use crate::{
    Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price, PriceSource, Timestamp,
    indicator::debug_assert_advancing,
};

/// Configuration for [`Ema`].
///
/// The first price seeds the average and keeps a shrinking share of every
/// later value. Set `enforce_convergence` to hold values back for
/// `3 × (length + 1)` bars, by which point that share is under 1%.
///
/// ```
/// use barlens_ta::{EmaConfig, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// let fast = EmaConfig::close(NonZero::new(12).unwrap());
/// assert_eq!(fast.required_bars(), 1);
///
/// let gated = EmaConfig::builder()
///     .length(NonZero::new(12).unwrap())
///     .enforce_convergence(true)
///     .build();
/// assert_eq!(gated.required_bars(), 39);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct EmaConfig {
    length: usize,
    source: PriceSource,
    convergence: bool,
    bars_to_converge: usize,
}

impl IndicatorConfig for EmaConfig {
    type Builder = EmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        EmaConfigBuilder {
            length: None,
            source: PriceSource::Close,
            convergence: false,
        }
    }

    #[inline]
    fn required_bars(&self) -> usize {
        self.bars_to_converge
    }
}

impl EmaConfig {
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }

    #[inline]
    #[must_use]
    pub fn enforce_convergence(&self) -> bool {
        self.convergence
    }

    /// EMA of the close, reported from the first bar.
    #[must_use]
    pub fn close(length: NonZero<usize>) -> Self {
        Self::builder().length(length).build()
    }
}

impl Display for EmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmaConfig({}, {}", self.length, self.source)?;
        if self.convergence {
            f.write_str(", converged")?;
        }
        f.write_str(")")
    }
}

/// Builder for [`EmaConfig`]. Source defaults to close, convergence
/// gating to off.
pub struct EmaConfigBuilder {
    length: Option<usize>,
    source: PriceSource,
    convergence: bool,
}

impl EmaConfigBuilder {
    #[inline]
    #[must_use]
    pub fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }

    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    #[inline]
    #[must_use]
    pub fn enforce_convergence(mut self, enforce: bool) -> Self {
        self.convergence = enforce;
        self
    }
}

impl IndicatorConfigBuilder<EmaConfig> for EmaConfigBuilder {
    #[inline]
    fn build(self) -> EmaConfig {
        let length = self.length.expect("length is required");

        EmaConfig {
            length,
            source: self.source,
            convergence: self.convergence,
            bars_to_converge: if self.convergence { 3 * (length + 1) } else { 1 },
        }
    }
}

/// Exponential moving average with `α = 2 / (length + 1)`:
///
/// ```text
/// ema = prev + α × (price − prev)
/// ```
///
/// `prev` starts as the first price. [`Sample`](crate::Sample)s let it
/// smooth another indicator's output, as MACD does with DIF.
///
/// ```
/// use barlens_ta::{Ema, EmaConfig, Sample};
/// use std::num::NonZero;
///
/// let mut ema = Ema::new(EmaConfig::close(NonZero::new(3).unwrap()));
///
/// assert_eq!(ema.compute(&Sample::new(1, 4.0)), Some(4.0));
/// // α = 0.5
/// assert_eq!(ema.compute(&Sample::new(2, 8.0)), Some(6.0));
/// ```
#[derive(Clone, Debug)]
pub struct Ema {
    config: EmaConfig,
    alpha: f64,
    current: Option<Price>,
    last_open_time: Option<Timestamp>,
    seen_bars: usize,
    prev_close: Option<Price>,
}

impl Indicator for Ema {
    type Config = EmaConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            current: None,
            last_open_time: None,
            seen_bars: 0,
            prev_close: None,
            #[allow(clippy::cast_precision_loss)]
            alpha: 2.0 / (config.length + 1) as f64,
        }
    }

    #[inline]
    fn compute(&mut self, ohlcv: &impl Ohlcv) -> Option<Price> {
        debug_assert_advancing(self.last_open_time, ohlcv.open_time());
        self.last_open_time = Some(ohlcv.open_time());

        let price = self.config.source.extract(ohlcv, self.prev_close);
        self.prev_close = Some(ohlcv.close());

        self.current = Some(match self.current {
            Some(previous) => self.alpha.mul_add(price - previous, previous),
            None => price,
        });

        if self.seen_bars < self.config.bars_to_converge {
            self.seen_bars += 1;
        }

        self.value()
    }

    #[inline]
    fn value(&self) -> Option<Price> {
        if self.seen_bars >= self.config.bars_to_converge {
            self.current
        } else {
            None
        }
    }
}

impl Display for Ema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({}, {})", self.config.length, self.config.source)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{
        Sample,
        test_util::{Bar, assert_approx, bar, nz},
    };

    fn ema(length: usize) -> Ema {
        Ema::new(EmaConfig::close(nz(length)))
    }

    fn gated(length: usize) -> Ema {
        Ema::new(
            EmaConfig::builder()
                .length(nz(length))
                .enforce_convergence(true)
                .build(),
        )
    }

    fn run(ema: &mut Ema, prices: &[f64]) -> Vec<Option<Price>> {
        prices
            .iter()
            .zip(1..)
            .map(|(&p, t)| ema.compute(&bar(p, t)))
            .collect()
    }

    #[test]
    fn empty_until_first_bar() {
        assert_eq!(ema(5).value(), None);
    }

    #[test]
    fn seeded_with_first_price() {
        assert_eq!(run(&mut ema(30), &[101.5]), [Some(101.5)]);
    }

    #[test]
    fn halves_the_distance_at_length_three() {
        // α = 0.5: 12 → 16 → 13
        assert_eq!(
            run(&mut ema(3), &[12.0, 20.0, 10.0]),
            [Some(12.0), Some(16.0), Some(13.0)]
        );
    }

    #[test]
    fn smoothing_factor_follows_length() {
        // α = 0.4: 10 + 0.4 × 15
        assert_approx!(run(&mut ema(4), &[10.0, 25.0])[1].unwrap(), 16.0);
        // α = 0.2: 10 + 0.2 × 15
        assert_approx!(run(&mut ema(9), &[10.0, 25.0])[1].unwrap(), 13.0);
    }

    #[test]
    fn length_one_tracks_price() {
        assert_eq!(
            run(&mut ema(1), &[3.0, 9.0, 4.0]),
            [Some(3.0), Some(9.0), Some(4.0)]
        );
    }

    #[test]
    fn flat_input_is_a_fixed_point() {
        let out = run(&mut ema(6), &[77.0; 40]);
        assert!(out.iter().all(|v| *v == Some(77.0)));
    }

    #[test]
    fn reads_configured_source() {
        let mut ema = Ema::new(
            EmaConfig::builder()
                .length(nz(3))
                .source(PriceSource::High)
                .build(),
        );
        ema.compute(&Bar::new(0.0, 10.0, 0.0, 0.0).at(1));
        assert_eq!(ema.compute(&Bar::new(0.0, 14.0, 0.0, 0.0).at(2)), Some(12.0));
    }

    #[test]
    fn smooths_samples() {
        let mut ema = ema(3);
        ema.compute(&Sample::new(1, -1.5));
        assert_eq!(ema.compute(&Sample::new(2, 0.5)), Some(-0.5));
    }

    mod convergence {
        use super::*;

        #[test]
        fn withheld_for_three_times_length_plus_one() {
            // 3 × (2 + 1) = 9
            let out = run(&mut gated(2), &[5.0; 10]);
            assert!(out[..8].iter().all(Option::is_none));
            assert_eq!(out[8..], [Some(5.0), Some(5.0)]);
        }

        #[test]
        fn gating_does_not_change_the_value() {
            let prices: Vec<f64> = (1..=15).map(|i| f64::from(i).sqrt() * 10.0).collect();
            let gated = run(&mut gated(3), &prices);
            let plain = run(&mut ema(3), &prices);

            assert_eq!(gated.last(), plain.last());
            assert!(gated.last().is_some_and(Option::is_some));
        }

        #[test]
        fn off_by_default() {
            let config = EmaConfig::close(nz(50));
            assert!(!config.enforce_convergence());
            assert_eq!(config.required_bars(), 1);
        }
    }

    #[test]
    fn length_is_required() {
        let result = std::panic::catch_unwind(|| EmaConfig::builder().build());
        assert!(result.is_err());
    }

    #[test]
    fn display() {
        assert_eq!(ema(26).to_string(), "EMA(26, Close)");
        assert_eq!(EmaConfig::close(nz(9)).to_string(), "EmaConfig(9, Close)");
        assert_eq!(
            gated(12).config.to_string(),
            "EmaConfig(12, Close, converged)"
        );
    }

    #[test]
    fn clone_keeps_its_own_state() {
        let mut original = ema(3);
        original.compute(&bar(10.0, 1));
        let mut copy = original.clone();

        assert_eq!(original.compute(&bar(20.0, 2)), Some(15.0));
        assert_eq!(copy.value(), Some(10.0));
        assert_eq!(copy.compute(&bar(2.0, 2)), Some(6.0));
    }
}
