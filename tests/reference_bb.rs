mod fixtures;

use barlens_ta::{Bb, BbConfig, BbValue};
use fixtures::{RefBbValue, assert_near, index_of, load_bars, load_ref};
use std::num::NonZero;

const REF_PATH: &str = "tests/fixtures/data/bb-20-2-close.csv";

/// The square root adds noise on top of the mean.
const TOLERANCE: f64 = 1e-6;

fn bb_20() -> Bb {
    Bb::new(BbConfig::close(NonZero::new(20).unwrap()))
}

fn stream() -> Vec<(u64, Option<BbValue>)> {
    let mut bb = bb_20();
    load_bars().iter().map(|bar| (bar.t, bb.compute(bar))).collect()
}

#[test]
fn bb_20_2_close_matches_reference() {
    let bars = load_bars();
    let reference: Vec<RefBbValue> = load_ref(REF_PATH);
    let values = stream();

    let first = index_of(&bars, reference[0].open_time);
    assert!(values[..first].iter().all(|(_, v)| v.is_none()));
    assert_eq!(values.len() - first, reference.len());

    for ((t, value), expected) in values[first..].iter().zip(&reference) {
        assert_eq!(*t, expected.open_time);
        let value = value.unwrap_or_else(|| panic!("BB(20, 2) missing at t={t}"));

        for (name, got, want) in [
            ("upper", value.upper(), expected.upper),
            ("middle", value.middle(), expected.middle),
            ("lower", value.lower(), expected.lower),
        ] {
            assert_near(got, want, TOLERANCE, &format!("BB(20, 2) {name} at t={t}"));
        }
    }
}

#[test]
fn bands_straddle_the_mean_evenly() {
    for (t, value) in stream() {
        let Some(value) = value else { continue };
        let ctx = format!("t={t}");

        assert!(value.lower() <= value.middle(), "{ctx}");
        assert!(value.middle() <= value.upper(), "{ctx}");
        assert_near(
            value.upper() - value.middle(),
            value.middle() - value.lower(),
            1e-9,
            &ctx,
        );
        assert!(value.band_width().is_some_and(|w| w >= 0.0), "{ctx}");
    }
}

#[test]
fn exclusion_time_lags_by_the_length() {
    let bars = load_bars();
    for (i, (_, value)) in stream().into_iter().enumerate() {
        if let Some(value) = value {
            assert_eq!(value.exclusion_time(), bars[i + 1 - 20].t, "bar {i}");
        }
    }
}
