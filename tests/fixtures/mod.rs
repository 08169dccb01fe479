#![allow(dead_code)]

use barlens_ta::Bar;
use serde::{Deserialize, de::DeserializeOwned};

/// Reference value with timestamp.
#[derive(Debug, Deserialize)]
pub struct RefValue {
    pub open_time: u64,
    pub expected: f64,
}

/// Reference BB value with timestamp.
#[derive(Debug, Deserialize)]
pub struct RefBbValue {
    pub open_time: u64,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Deserialize)]
pub struct RefKdValue {
    pub open_time: u64,
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

#[derive(Debug, Deserialize)]
pub struct RefMacdValue {
    pub open_time: u64,
    pub dif: f64,
    pub dem: f64,
    pub osc: f64,
}

/// Reference DMI value; `adx` is empty until it has warmed up.
#[derive(Debug, Deserialize)]
pub struct RefDmiValue {
    pub open_time: u64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: Option<f64>,
}

const BARS_PATH: &str = "tests/fixtures/data/bars-1d.csv";

/// Load the daily bar series every reference file was computed from.
///
/// 320 bars with a handful of opening gaps, one flat bar (index 100) and one
/// zero-volume bar (index 150).
pub fn load_bars() -> Vec<Bar> {
    load_records(BARS_PATH, "invalid bar record")
}

/// Load single-value reference data (SMA, EMA, RSI, ...).
pub fn load_ref_values(path: &str) -> Vec<RefValue> {
    load_records(path, "invalid reference record")
}

/// Load multi-column reference data.
pub fn load_ref<D: DeserializeOwned>(path: &str) -> Vec<D> {
    load_records(path, "invalid reference record")
}

/// Assert two f64 values are within tolerance.
pub fn assert_near(actual: f64, expected: f64, tolerance: f64, context: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "{context}: expected {expected:.10}, got {actual:.10}, diff {diff:.2e} > tolerance {tolerance:.2e}"
    );
}

/// Index of the bar opening at `open_time`.
pub fn index_of(bars: &[Bar], open_time: u64) -> usize {
    bars.iter()
        .position(|bar| bar.t == open_time)
        .unwrap_or_else(|| panic!("no bar at t={open_time}"))
}

/// Generate reference, availability and snapshot tests for a single-value
/// indicator. `$extract` maps the indicator output to the compared number.
///
/// Usage: `reference_test!(sma_20, Sma, SmaConfig::close(nz(20)), "tests/fixtures/data/sma-20-close.csv", 1e-6, |v: SmaValue| v.average());`
#[allow(unused_macros)]
macro_rules! reference_test {
    ($name:ident, $ind:ty, $config:expr, $ref_path:expr, $tolerance:expr, $extract:expr) => {
        mod $name {
            #[allow(unused_imports)]
            use super::*;
            use super::fixtures::*;
            use barlens_ta::*;
            use std::num::NonZero;

            #[allow(dead_code)]
            fn nz(n: usize) -> NonZero<usize> {
                NonZero::new(n).unwrap()
            }

            #[test]
            fn matches_reference() {
                let bars = load_bars();
                let reference = load_ref_values($ref_path);
                let extract = $extract;
                let mut ind = <$ind>::new($config);

                let mut ref_idx = 0;
                for bar in &bars {
                    ind.compute(bar);

                    if ref_idx < reference.len() && bar.t == reference[ref_idx].open_time {
                        let value = ind.value().map(extract).unwrap_or_else(|| {
                            panic!("{} returned None at t={}", stringify!($name), bar.t)
                        });
                        assert_near(
                            value,
                            reference[ref_idx].expected,
                            $tolerance,
                            &format!("{} at bar {ref_idx} (t={})", stringify!($name), bar.t),
                        );
                        ref_idx += 1;
                    }
                }

                assert_eq!(
                    ref_idx,
                    reference.len(),
                    "not all reference values checked: {ref_idx}/{}",
                    reference.len()
                );
            }

            #[test]
            fn unavailable_before_first_reference_value() {
                let bars = load_bars();
                let reference = load_ref_values($ref_path);
                let first = index_of(&bars, reference[0].open_time);
                let config = $config;
                let mut ind = <$ind>::new(config);

                for (i, bar) in bars.iter().enumerate() {
                    let value = ind.compute(bar);
                    assert_eq!(value.is_some(), i >= first, "availability at bar {i}");
                }
                assert_eq!(IndicatorConfig::required_bars(&config), first + 1);
            }

            #[test]
            fn snapshot_continues_identically() {
                let bars = load_bars();
                let (head, tail) = bars.split_at(bars.len() / 2);
                let mut original = <$ind>::new($config);
                for bar in head {
                    original.compute(bar);
                }

                let mut snapshot = original.clone();
                for bar in tail {
                    assert_eq!(original.compute(bar), snapshot.compute(bar), "t={}", bar.t);
                }
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use reference_test;

fn load_records<D>(path: &str, expect_msg: &str) -> Vec<D>
where
    D: DeserializeOwned,
{
    let mut rdr =
        csv::Reader::from_path(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));

    rdr.deserialize().map(|r| r.expect(expect_msg)).collect()
}
