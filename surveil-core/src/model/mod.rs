//! Time-series model: ARIMA fitting and interval forecasts.

pub mod arima;
pub mod nelder_mead;
pub mod transform;

pub use arima::{fit, ArimaOrder, FitError, FittedArima, IntervalForecast};
pub use nelder_mead::NelderMead;
