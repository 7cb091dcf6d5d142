//! End-to-end screening scenarios over in-memory and CSV-backed providers.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use surveil_core::data::{
    CsvProvider, DataError, DataProvider, DataSource, FetchResult, HistoryRange,
    ParquetSeriesCache,
};
use surveil_core::domain::{Instrument, RawClose, RawSeries};
use surveil_core::{round2, Status};
use surveil_runner::{
    export_csv, CachedSource, FitCache, LoadOptions, ScreenConfig, ScreeningPipeline,
    ScreeningRow,
};

struct InMemory(HashMap<String, RawSeries>);

impl DataProvider for InMemory {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, symbol: &str, _range: &HistoryRange) -> Result<FetchResult, DataError> {
        let series = self
            .0
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
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

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn numbers(values: impl IntoIterator<Item = f64>) -> RawSeries {
    RawSeries::from_closes(start(), values.into_iter().map(Some))
}

fn provider(entries: Vec<(&str, RawSeries)>) -> Arc<dyn DataProvider> {
    Arc::new(InMemory(
        entries
            .into_iter()
            .map(|(s, r)| (s.to_string(), r))
            .collect(),
    ))
}

fn single(symbol: &str, series: RawSeries) -> ScreeningRow {
    let p = ScreeningPipeline::new(provider(vec![(symbol, series)]));
    let mut rows = p
        .run(&[Instrument::new(symbol, symbol)], 120, 30)
        .unwrap();
    assert_eq!(rows.len(), 1);
    rows.remove(0)
}

#[test]
fn linear_ramp_is_ok() {
    let row = single("LIN", numbers((10..30).map(f64::from)));
    assert_eq!(row.status, Status::Ok);
    assert_eq!(row.on_mkt, Some(29.0));
    assert_eq!(row.min, Some(10.0));
    assert_eq!(row.max, Some(29.0));
    assert_eq!(row.avg, Some(19.5));

    let (lo, v, hi) = (
        row.forecast_min.unwrap(),
        row.forecast_value.unwrap(),
        row.forecast_max.unwrap(),
    );
    assert!(lo.is_finite() && v.is_finite() && hi.is_finite());
    assert!(lo <= v && v <= hi);
    assert_eq!(
        row.delta_pct,
        Some(round2((v - 29.0) / 29.0 * 100.0))
    );
}

#[test]
fn all_text_is_no_data() {
    let raw = RawSeries::from_closes(
        start(),
        ["a", "b", "n/a", "--"].into_iter().map(|s| Some(RawClose::from(s))),
    );
    let row = single("TXT", raw);
    assert_eq!(row.status, Status::NoData);
    assert_eq!(row.cells().iter().filter(|c| c.is_none()).count(), 8);
}

#[test]
fn five_points_are_too_short() {
    let row = single("FIVE", numbers([12.0, 15.5, 11.0, 13.25, 14.0]));
    assert_eq!(row.status, Status::TooShortForArima);
    assert_eq!(row.forecast_value, row.on_mkt);
    assert_eq!(row.forecast_min, row.min);
    assert_eq!(row.forecast_max, row.max);
    assert_eq!(row.delta_pct, Some(0.0));
}

#[test]
fn missing_close_field_is_no_data() {
    let row = single("NOCLOSE", RawSeries::without_close([start()]));
    assert_eq!(row.status, Status::NoData);
    assert!(row.on_mkt.is_none());
}

#[test]
fn trailing_gap_leaves_on_mkt_missing() {
    let raw = RawSeries::from_closes(
        start(),
        (0..30)
            .map(|i| Some(100.0 + (i as f64 * 0.9).sin()))
            .chain(std::iter::once(None)),
    );
    let row = single("GAP", raw);
    assert_eq!(row.status, Status::Ok);
    assert!(row.on_mkt.is_none());
    assert!(row.delta_pct.is_none());
    assert!(row.forecast_value.is_some());
}

#[test]
fn default_universe_keeps_order_and_size() {
    let cfg = ScreenConfig::default();
    let universe = cfg.universe();
    let p = ScreeningPipeline::from_config(provider(vec![("NVDA", numbers((10..30).map(f64::from)))]), &cfg);
    let rows = p.run(&universe.instruments, 120, 30).unwrap();
    let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, universe.symbols());
    assert_eq!(rows[6].status, Status::Ok);
    assert!(rows
        .iter()
        .enumerate()
        .all(|(i, r)| i == 6 || r.status == Status::NoData));
}

#[test]
fn repeated_runs_are_identical() {
    let entries = || {
        vec![
            ("A", numbers((0..200).map(|i| 50.0 + (i as f64 * 0.21).sin() * 4.0))),
            ("B", numbers((10..30).map(f64::from))),
            ("C", numbers([1.0, 2.0, 3.0])),
        ]
    };
    let universe: Vec<Instrument> = ["A", "B", "C"].map(|s| Instrument::new(s, s)).to_vec();
    let first = ScreeningPipeline::new(provider(entries()))
        .run(&universe, 120, 60)
        .unwrap();
    let second = ScreeningPipeline::new(provider(entries()))
        .run(&universe, 120, 60)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(export_csv(&first).unwrap(), export_csv(&second).unwrap());
}

#[test]
fn parallel_matches_sequential() {
    let entries: Vec<(String, RawSeries)> = (0..12)
        .map(|k| {
            let len = 3 + k * 17;
            (
                format!("S{k}"),
                numbers((0..len).map(move |i| 20.0 + ((i + k) as f64 * 0.37).cos() * 2.0)),
            )
        })
        .collect();
    let universe: Vec<Instrument> = entries
        .iter()
        .map(|(s, _)| Instrument::new(s.clone(), s.clone()))
        .collect();
    let make = || -> Arc<dyn DataProvider> { Arc::new(InMemory(entries.iter().cloned().collect())) };

    let sequential = ScreeningPipeline::new(make()).run(&universe, 120, 30).unwrap();
    let parallel = ScreeningPipeline::new(make())
        .with_parallel(true)
        .with_fit_cache(Arc::new(FitCache::new(std::time::Duration::from_secs(60))))
        .run(&universe, 120, 30)
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn csv_source_through_cached_loader() {
    let csv_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let mut body = String::from("Date,Close\n");
    for (i, v) in (10..30).enumerate() {
        let date = start() + chrono::Duration::days(i as i64);
        body.push_str(&format!("{date},{v}\n"));
    }
    std::fs::write(csv_dir.path().join("LIN.csv"), body).unwrap();

    let source = CachedSource::new(
        CsvProvider::new(csv_dir.path()),
        Some(ParquetSeriesCache::new(cache_dir.path())),
        LoadOptions::default(),
    );
    let range = HistoryRange::new(
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
    );
    let p = ScreeningPipeline::new(Arc::new(source)).with_range(range);
    let universe = [Instrument::new("LINEAR", "LIN"), Instrument::new("MISSING", "NONE")];

    let fresh = p.run(&universe, 120, 30).unwrap();
    let cached = p.run(&universe, 120, 30).unwrap();
    assert_eq!(fresh, cached);
    assert_eq!(fresh[0].status, Status::Ok);
    assert_eq!(fresh[1].status, Status::NoData);
    assert!(cache_dir.path().join("symbol=LIN/series.parquet").exists());
}
