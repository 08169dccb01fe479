#![allow(clippy::float_cmp)]

mod fixtures;

use barlens_ta::{
    Bar, EnrichedRow, Error, IchimokuValue, Pipeline, PipelineConfig, Timestamp, Trend,
    compute_indicators, ichimoku, validate_sequence,
};
use fixtures::{assert_near, load_bars, load_ref_values};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn first(rows: &[EnrichedRow], available: impl Fn(&EnrichedRow) -> bool) -> Option<usize> {
    rows.iter().position(available)
}

/// Every number a row carries, for finiteness checks.
fn numbers(row: &EnrichedRow) -> Vec<f64> {
    let mut out = Vec::new();

    for (_, value) in row.ma.iter().chain(&row.volume_ma) {
        out.extend(value.iter().flat_map(|v| [v.average(), v.exclusion()]));
    }
    out.extend(row.rsi.iter().filter_map(|(_, v)| *v));
    out.extend(row.boll.iter().flat_map(|v| [v.upper(), v.middle(), v.lower()]));
    out.extend(row.kd.iter().flat_map(|v| [v.k(), v.d(), v.j()]));
    out.extend(row.macd.iter().flat_map(|v| [v.dif(), v.dem(), v.osc()]));
    if let Some(dmi) = row.dmi {
        out.extend([dmi.plus_di(), dmi.minus_di()]);
        out.extend(dmi.adx());
    }
    if let Some(ichimoku) = row.ichimoku {
        out.push(ichimoku.chikou());
        out.extend(
            [ichimoku.tenkan(), ichimoku.kijun(), ichimoku.senkou_a(), ichimoku.senkou_b()]
                .into_iter()
                .flatten(),
        );
    }
    out.extend([row.mfi, row.obv, row.obv_ema, row.cmf, row.cmf_ema].into_iter().flatten());

    out
}

fn closes(values: &[f64]) -> Vec<Bar> {
    values
        .iter()
        .zip(1..)
        .map(|(&c, t)| Bar::new(t, c, c, c, c, 100.0))
        .collect()
}

mod batch {
    use super::*;

    #[test]
    fn is_deterministic() {
        init_tracing();
        let bars = load_bars();
        let config = PipelineConfig::default();

        let first = compute_indicators(&bars, &config).unwrap();
        let second = compute_indicators(&bars, &config).unwrap();

        assert_eq!(first.len(), bars.len());
        assert_eq!(first, second);
    }

    #[test]
    fn rows_follow_the_input_bars() {
        let bars = load_bars();
        let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();

        for (row, bar) in rows.iter().zip(&bars) {
            assert_eq!(&row.bar, bar);
        }
    }

    #[test]
    fn every_value_is_finite() {
        let bars = load_bars();
        let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();

        for row in &rows {
            for value in numbers(row) {
                assert!(value.is_finite(), "non-finite value at t={}", row.bar.t);
            }
        }
    }

    #[test]
    fn availability_boundaries() {
        let bars = load_bars();
        let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();

        assert_eq!(first(&rows, |r| r.ma(5).is_some()), Some(4));
        assert_eq!(first(&rows, |r| r.ma(240).is_some()), Some(239));
        assert_eq!(first(&rows, |r| r.volume_ma(10).is_some()), Some(9));
        assert_eq!(first(&rows, |r| r.boll.is_some()), Some(19));
        assert_eq!(first(&rows, |r| r.kd.is_some()), Some(8));
        assert_eq!(first(&rows, |r| r.rsi(5).is_some()), Some(5));
        assert_eq!(first(&rows, |r| r.mfi.is_some()), Some(14));
        assert_eq!(first(&rows, |r| r.macd.is_some()), Some(0));
        assert_eq!(first(&rows, |r| r.obv.is_some()), Some(0));
        assert_eq!(first(&rows, |r| r.obv_ema.is_some()), Some(0));
        assert_eq!(first(&rows, |r| r.cmf.is_some()), Some(20));
        assert_eq!(first(&rows, |r| r.cmf_ema.is_some()), Some(20));
        assert_eq!(first(&rows, |r| r.dmi.is_some()), Some(14));
        assert_eq!(first(&rows, |r| r.dmi.and_then(|d| d.adx()).is_some()), Some(27));
        assert_eq!(first(&rows, |r| r.ichimoku.and_then(|i| i.senkou_b()).is_some()), Some(51));
    }

    #[test]
    fn trend_waits_for_the_longest_average() {
        let bars = load_bars();
        let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();

        assert!(rows[..239].iter().all(|row| row.trend == Trend::Ranging));
    }

    #[test]
    fn empty_input_gives_no_rows() {
        let none: [Bar; 0] = [];
        assert!(compute_indicators(&none, &PipelineConfig::default()).unwrap().is_empty());
    }
}

mod incremental {
    use super::*;

    #[test]
    fn append_matches_batch() {
        let bars = load_bars();
        let config = PipelineConfig::default();
        let batch = compute_indicators(&bars, &config).unwrap();

        let mut pipeline = Pipeline::new(&config);
        for (bar, expected) in bars.iter().zip(&batch) {
            assert_eq!(&pipeline.append(bar).unwrap(), expected);
        }
        assert_eq!(pipeline.len(), bars.len());
    }

    #[test]
    fn clone_continues_identically() {
        let bars = load_bars();
        let (head, tail) = bars.split_at(200);

        let mut original = Pipeline::new(&PipelineConfig::default());
        for bar in head {
            original.append(bar).unwrap();
        }

        let mut snapshot = original.clone();
        for bar in tail {
            assert_eq!(original.append(bar).unwrap(), snapshot.append(bar).unwrap());
        }
    }

    #[test]
    fn rejected_bar_leaves_state_untouched() {
        init_tracing();
        let bars = load_bars();
        let config = PipelineConfig::default();
        let batch = compute_indicators(&bars, &config).unwrap();

        let mut pipeline = Pipeline::new(&config);
        for bar in &bars[..10] {
            pipeline.append(bar).unwrap();
        }

        assert_eq!(
            pipeline.append(&bars[5]),
            Err(Error::MalformedSequence {
                index: 10,
                previous: bars[9].t,
                current: bars[5].t,
            })
        );
        assert_eq!(pipeline.len(), 10);

        for (bar, expected) in bars[10..].iter().zip(&batch[10..]) {
            assert_eq!(&pipeline.append(bar).unwrap(), expected);
        }
    }
}

mod sequence {
    use super::*;

    #[test]
    fn fixture_is_well_formed() {
        assert_eq!(validate_sequence(&load_bars()), Ok(()));
    }

    #[test]
    fn swapped_bars_are_rejected() {
        let mut bars = load_bars();
        bars.swap(3, 4);

        let expected = Error::MalformedSequence {
            index: 4,
            previous: bars[3].t,
            current: bars[4].t,
        };
        assert_eq!(validate_sequence(&bars), Err(expected));
        assert_eq!(
            compute_indicators(&bars, &PipelineConfig::default()),
            Err(expected)
        );
    }

    #[test]
    fn duplicate_open_time_is_rejected() {
        let mut bars = load_bars();
        bars[7].t = bars[6].t;

        assert!(matches!(
            validate_sequence(&bars),
            Err(Error::MalformedSequence { index: 7, .. })
        ));
    }
}

mod configuration {
    use super::*;

    #[test]
    fn json_document_selects_indicators() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "ma": [20],
                "volume_ma": [],
                "boll": null,
                "kd": null,
                "rsi": [],
                "mfi": null,
                "macd": null,
                "obv": false,
                "cmf": null,
                "dmi": null,
                "ichimoku": null
            }"#,
        )
        .unwrap();

        let bars = load_bars();
        let reference = load_ref_values("tests/fixtures/data/sma-20-close.csv");
        let rows = compute_indicators(&bars, &config).unwrap();

        for (row, expected) in rows[19..].iter().zip(&reference) {
            assert_eq!(row.bar.t, expected.open_time);
            assert_near(
                row.ma(20).unwrap().average(),
                expected.expected,
                1e-6,
                "MA(20) from JSON config",
            );
            assert_eq!(row.ma.len(), 1);
            assert!(row.boll.is_none() && row.kd.is_none() && row.macd.is_none());
            assert!(row.obv.is_none() && row.obv_ema.is_none());
            assert!(row.cmf.is_none() && row.cmf_ema.is_none());
            assert!(row.ichimoku.is_none());
        }
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<PipelineConfig>(&json).unwrap(), config);
    }

    #[test]
    fn rows_serialize() {
        let bars = load_bars();
        let rows = compute_indicators(&bars[..30], &PipelineConfig::default()).unwrap();
        let json = serde_json::to_value(&rows[29]).unwrap();

        assert_eq!(json["bar"]["t"], bars[29].t);
        assert_eq!(json["trend"], "ranging");
        assert!(json["kd"]["k"].is_number());
    }
}

mod worked_examples {
    use super::*;

    #[test]
    fn obv_accumulates_signed_volume() {
        let config = PipelineConfig {
            obv: true,
            ..PipelineConfig::empty()
        };
        let bars: Vec<_> = [
            (10.0, 100.0),
            (11.0, 200.0),
            (10.0, 150.0),
            (10.0, 150.0),
            (12.0, 300.0),
        ]
        .into_iter()
        .zip(1..)
        .map(|((c, v), t)| Bar::new(t, c, c, c, c, v))
        .collect();

        let obv: Vec<_> = compute_indicators(&bars, &config)
            .unwrap()
            .iter()
            .map(|row| row.obv)
            .collect();
        assert_eq!(
            obv,
            [Some(100.0), Some(300.0), Some(150.0), Some(150.0), Some(450.0)]
        );
    }

    #[test]
    fn rsi_without_losses_is_100() {
        let config = PipelineConfig {
            rsi: vec![std::num::NonZero::new(5).unwrap()],
            ..PipelineConfig::empty()
        };
        let bars = closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let rows = compute_indicators(&bars, &config).unwrap();

        assert_eq!(rows[4].rsi(5), None);
        assert_eq!(rows[5].rsi(5), Some(100.0));
        assert_eq!(rows[6].rsi(5), Some(100.0));
    }

    #[test]
    fn flat_series_has_zero_macd() {
        let config = PipelineConfig {
            macd: Some(Default::default()),
            ..PipelineConfig::empty()
        };
        let rows = compute_indicators(&closes(&[50.0; 40]), &config).unwrap();

        for row in &rows {
            let macd = row.macd.unwrap();
            assert_eq!((macd.dif(), macd.dem(), macd.osc()), (0.0, 0.0, 0.0));
        }
    }
}

mod ichimoku_display {
    use super::*;

    #[test]
    fn cloud_and_lagging_span_are_shifted() {
        let bars = load_bars();
        let rows = compute_indicators(&bars, &PipelineConfig::default()).unwrap();
        let values: Vec<(Timestamp, IchimokuValue)> = rows
            .iter()
            .map(|row| (row.bar.t, row.ichimoku.unwrap()))
            .collect();

        let shift = ichimoku::DISPLACEMENT;
        let display = ichimoku::display_rows(&values, shift);
        assert_eq!(display.len(), bars.len() + shift);

        for (i, row) in display.iter().enumerate() {
            if i < bars.len() {
                assert_eq!(row.time, Some(bars[i].t));
            } else {
                assert_eq!(row.time, None);
            }

            let source = i.checked_sub(shift).and_then(|s| values.get(s));
            assert_eq!(row.senkou_a, source.and_then(|(_, v)| v.senkou_a()), "row {i}");
            assert_eq!(row.senkou_b, source.and_then(|(_, v)| v.senkou_b()), "row {i}");
            assert_eq!(row.chikou, bars.get(i + shift).map(|bar| bar.c), "row {i}");
        }
    }
}
