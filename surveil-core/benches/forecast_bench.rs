//! Criterion benchmarks for the screening hot paths.
//!
//! Benchmarks:
//! 1. ARIMA(2,0,2) fit + forecast across the supported windows
//! 2. Series cleaning of a five-year raw history

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use surveil_core::data::{HistoryRange, SyntheticProvider};
use surveil_core::{clean, ForecastEngine};

fn five_years() -> HistoryRange {
    HistoryRange::new(
        chrono::NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )
}

fn bench_forecast(c: &mut Criterion) {
    let raw = SyntheticProvider::generate("BENCH", &five_years());
    let engine = ForecastEngine::default();
    let mut group = c.benchmark_group("forecast");
    for window in [120usize, 360, 720] {
        let Some(series) = clean(&raw, window) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(window), &series, |b, s| {
            b.iter(|| engine.forecast(black_box(s), 30))
        });
    }
    group.finish();
}

fn bench_clean(c: &mut Criterion) {
    let raw = SyntheticProvider::generate("BENCH", &five_years());
    c.bench_function("clean_720", |b| b.iter(|| clean(black_box(&raw), 720)));
}

criterion_group!(benches, bench_forecast, bench_clean);
criterion_main!(benches);
