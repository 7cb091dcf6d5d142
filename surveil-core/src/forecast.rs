//! Forecast engine: length gate, fixed-order ARIMA fit, degenerate fallback.
//!
//! The engine never fails. A series below the gate or a fit that errors out
//! still yields a [`ForecastOutcome`]; the [`Forecast`] variant records which
//! path produced it.

use crate::domain::CleanSeries;
use crate::model::{fit, ArimaOrder, FitError};
use serde::{Deserialize, Serialize};

/// Engine settings. The model order is fixed per run, never selected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSettings {
    pub order: ArimaOrder,
    /// Shortest cleaned series the model is attempted on.
    pub min_for_model: usize,
    pub confidence_level: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            min_for_model: 10,
            confidence_level: 0.95,
        }
    }
}

/// Point forecast and band at the final horizon step, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
    pub used_fallback: bool,
}

impl ForecastOutcome {
    /// Last value as the point, series range as the band.
    pub fn degenerate(series: &CleanSeries) -> Self {
        Self {
            point: round2(series.last()),
            lower: round2(series.min()),
            upper: round2(series.max()),
            used_fallback: true,
        }
    }
}

/// What the engine did for one series.
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    /// The model was fitted and forecast.
    Modelled(ForecastOutcome),
    /// Below the length gate; no fit attempted.
    TooShort(ForecastOutcome),
    /// Fit or forecast failed; degenerate values used.
    FitFailed {
        outcome: ForecastOutcome,
        error: FitError,
    },
}

impl Forecast {
    pub fn outcome(&self) -> &ForecastOutcome {
        match self {
            Forecast::Modelled(o) | Forecast::TooShort(o) => o,
            Forecast::FitFailed { outcome, .. } => outcome,
        }
    }
}

/// Length gate, ARIMA fit and degenerate fallback for one cleaned series.
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    settings: ForecastSettings,
}

impl ForecastEngine {
    /// Engine with the given order, gate and confidence level.
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Forecast `horizon` steps past the end of `series`.
    pub fn forecast(&self, series: &CleanSeries, horizon: usize) -> Forecast {
        if series.len() < self.settings.min_for_model {
            return Forecast::TooShort(ForecastOutcome::degenerate(series));
        }

        match self.fit_and_forecast(series, horizon) {
            Ok(outcome) => Forecast::Modelled(outcome),
            Err(error) => {
                tracing::warn!(%error, len = series.len(), "ARIMA fit failed; using fallback values");
                Forecast::FitFailed {
                    outcome: ForecastOutcome::degenerate(series),
                    error,
                }
            }
        }
    }

    fn fit_and_forecast(
        &self,
        series: &CleanSeries,
        horizon: usize,
    ) -> Result<ForecastOutcome, FitError> {
        let model = fit(series.values(), self.settings.order)?;
        if !model.converged() {
            tracing::debug!(
                iterations = model.iterations(),
                "optimiser stopped at iteration limit"
            );
        }
        let band = model.forecast(horizon, self.settings.confidence_level)?;
        let (point, lower, upper) = band.final_step().ok_or(FitError::ZeroHorizon)?;
        Ok(ForecastOutcome {
            point: round2(point),
            lower: round2(lower),
            upper: round2(upper),
            used_fallback: false,
        })
    }
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
