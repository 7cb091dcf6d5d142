//! Property tests over whole screening rows.
//!
//! Uses proptest to verify:
//! 1. One row per instrument, in universe order
//! 2. Δ% agrees with the rounded forecast and last price on every OK row
//! 3. Rows without numeric input carry no numbers
//! 4. Short cleaned series reproduce the last value and range

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use surveil_core::data::{DataError, DataProvider, DataSource, FetchResult, HistoryRange};
use surveil_core::domain::{Instrument, RawClose, RawSeries};
use surveil_core::{round2, Status};
use surveil_runner::ScreeningPipeline;

struct InMemory(HashMap<String, RawSeries>);

impl DataProvider for InMemory {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, symbol: &str, _range: &HistoryRange) -> Result<FetchResult, DataError> {
        let series = self.0.get(symbol).cloned().unwrap_or_else(RawSeries::empty);
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
            source: DataSource::Cache,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_close() -> impl Strategy<Value = Option<RawClose>> {
    prop_oneof![
        6 => (1.0..400.0_f64).prop_map(|v| Some(RawClose::Number(v))),
        1 => Just(Some(RawClose::Text("bad".into()))),
        1 => Just(None),
    ]
}

fn arb_raw() -> impl Strategy<Value = RawSeries> {
    prop::collection::vec(arb_close(), 0..60).prop_map(|closes| {
        RawSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes)
    })
}

fn screen(series: Vec<RawSeries>) -> Vec<surveil_runner::ScreeningRow> {
    let map = series
        .into_iter()
        .enumerate()
        .map(|(i, s)| (format!("S{i}"), s))
        .collect::<HashMap<_, _>>();
    let universe: Vec<Instrument> = (0..map.len())
        .map(|i| Instrument::new(format!("NAME {i}"), format!("S{i}")))
        .collect();
    ScreeningPipeline::new(Arc::new(InMemory(map)))
        .run(&universe, 120, 30)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn one_row_per_instrument_in_order(series in prop::collection::vec(arb_raw(), 1..6)) {
        let n = series.len();
        let rows = screen(series);
        prop_assert_eq!(rows.len(), n);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(&row.ticker, &format!("S{i}"));
        }
    }

    #[test]
    fn row_invariants(raw in arb_raw()) {
        let valid = raw.observations.iter().filter(|o| o.close.as_ref().and_then(RawClose::coerce).is_some()).count();
        let last_valid = raw.last_close();
        let row = screen(vec![raw]).remove(0);

        match row.status {
            Status::Ok => {
                if let (Some(v), Some(m)) = (row.forecast_value, row.on_mkt) {
                    prop_assert_eq!(row.delta_pct, Some(round2((v - m) / m * 100.0)));
                }
            }
            Status::NoData => {
                prop_assert_eq!(valid, 0);
                prop_assert!(row.cells()[2..10].iter().all(Option::is_none));
            }
            Status::TooShortForArima => {
                prop_assert!((1..10).contains(&valid));
                prop_assert_eq!(row.forecast_min, row.min);
                prop_assert_eq!(row.forecast_max, row.max);
                if last_valid.is_some() {
                    prop_assert_eq!(row.forecast_value, row.on_mkt);
                    prop_assert_eq!(row.delta_pct, Some(0.0));
                }
            }
            Status::InsufficientData => {
                prop_assert!((10..20).contains(&valid));
                prop_assert!(row.forecast_value.is_none());
            }
            Status::ArimaFallback => prop_assert!(valid >= 20),
            Status::Error => prop_assert!(false, "in-memory data never errors"),
        }
    }
}
