//! Screening pipeline: fetch → clean → gate → forecast → classify, per
//! instrument, aggregated into one row each.
//!
//! Failures are isolated per instrument. Whatever goes wrong for one symbol
//! ends up as that row's STATUS, including a panic inside a provider or the
//! model. The run itself only fails when there is nothing to screen.

use crate::config::{ScreenConfig, Thresholds};
use crate::fit_cache::{FitCache, FitKey};
use crate::row::ScreeningRow;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use surveil_core::data::{DataError, DataProvider, HistoryRange};
use surveil_core::domain::Instrument;
use surveil_core::{classify, clean, Forecast, ForecastEngine, ProcessingPath, Status};
use thiserror::Error;

/// Errors that abort a whole screen.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("screen produced no rows (empty universe)")]
    NoResults,
}

/// Anything that turns an instrument's row into an ERROR row.
#[derive(Debug, Error)]
enum RowError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("forecast produced a non-finite value")]
    NonFiniteOutcome,
}

/// Screens a universe against one data provider, one row per instrument.
pub struct ScreeningPipeline {
    provider: Arc<dyn DataProvider>,
    engine: ForecastEngine,
    thresholds: Thresholds,
    range: HistoryRange,
    fit_cache: Option<Arc<FitCache>>,
    parallel: bool,
}

impl ScreeningPipeline {
    /// Default thresholds and model, five years of history up to today.
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            engine: ForecastEngine::default(),
            thresholds: Thresholds::default(),
            range: HistoryRange::last_years(5),
            fit_cache: None,
            parallel: false,
        }
    }

    /// Engine, thresholds and history length from a run configuration.
    pub fn from_config(provider: Arc<dyn DataProvider>, config: &ScreenConfig) -> Self {
        Self {
            engine: ForecastEngine::new(config.forecast_settings()),
            thresholds: config.thresholds,
            range: HistoryRange::last_years(config.history_years),
            ..Self::new(provider)
        }
    }

    pub fn with_range(mut self, range: HistoryRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_fit_cache(mut self, cache: Arc<FitCache>) -> Self {
        self.fit_cache = Some(cache);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn range(&self) -> &HistoryRange {
        &self.range
    }

    /// One row per instrument, in universe order.
    pub fn run(
        &self,
        universe: &[Instrument],
        historical_window: usize,
        forecast_horizon: usize,
    ) -> Result<Vec<ScreeningRow>, PipelineError> {
        tracing::info!(
            instruments = universe.len(),
            window = historical_window,
            horizon = forecast_horizon,
            parallel = self.parallel,
            provider = self.provider.name(),
            "starting screen"
        );

        let process = |inst: &Instrument| self.process(inst, historical_window, forecast_horizon);
        let rows: Vec<ScreeningRow> = if self.parallel {
            universe.par_iter().map(process).collect()
        } else {
            universe.iter().map(process).collect()
        };

        if rows.is_empty() {
            return Err(PipelineError::NoResults);
        }

        let ok = rows.iter().filter(|r| r.status == Status::Ok).count();
        tracing::info!(rows = rows.len(), ok, "screen finished");
        Ok(rows)
    }

    fn process(&self, instrument: &Instrument, window: usize, horizon: usize) -> ScreeningRow {
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            self.build_row(instrument, window, horizon)
        }));
        let result = match built {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!(
                    symbol = %instrument.symbol,
                    panic = panic_message(payload.as_ref()),
                    "instrument panicked"
                );
                return ScreeningRow::empty(instrument, classify(ProcessingPath::Failed));
            }
        };

        match result {
            Ok(row) => {
                tracing::debug!(symbol = %instrument.symbol, status = %row.status, "processed");
                row
            }
            Err(RowError::Data(DataError::SymbolNotFound { .. })) => {
                tracing::debug!(symbol = %instrument.symbol, "symbol not found");
                ScreeningRow::empty(instrument, classify(ProcessingPath::NoData))
            }
            Err(e) => {
                tracing::warn!(symbol = %instrument.symbol, error = %e, "instrument failed");
                ScreeningRow::empty(instrument, classify(ProcessingPath::Failed))
            }
        }
    }

    fn build_row(
        &self,
        instrument: &Instrument,
        window: usize,
        horizon: usize,
    ) -> Result<ScreeningRow, RowError> {
        let no_data = || ScreeningRow::empty(instrument, classify(ProcessingPath::NoData));

        let fetched = self.provider.fetch(&instrument.symbol, &self.range)?;
        let raw = &fetched.series;
        if raw.is_empty() || !raw.has_close {
            return Ok(no_data());
        }

        let on_mkt = raw.last_close();
        let Some(series) = clean(raw, window) else {
            return Ok(no_data());
        };

        let len = series.len();
        if len >= self.thresholds.min_for_model && len < self.thresholds.min_usable {
            let status = classify(ProcessingPath::Insufficient);
            return Ok(ScreeningRow::with_stats(instrument, on_mkt, &series, status));
        }

        let forecast = match &self.fit_cache {
            Some(cache) => {
                let key = FitKey::new(&series, horizon, self.engine.settings());
                cache.get_or_insert_with(key, || self.engine.forecast(&series, horizon))
            }
            None => self.engine.forecast(&series, horizon),
        };

        let path = match &forecast {
            Forecast::Modelled(_) => ProcessingPath::Modelled,
            Forecast::TooShort(_) => ProcessingPath::TooShort,
            Forecast::FitFailed { .. } => ProcessingPath::FitFailed,
        };
        let outcome = forecast.outcome();
        if ![outcome.point, outcome.lower, outcome.upper]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(RowError::NonFiniteOutcome);
        }

        Ok(ScreeningRow::with_stats(instrument, on_mkt, &series, classify(path))
            .with_forecast(outcome))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
