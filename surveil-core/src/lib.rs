//! Surveil Core: domain types, series cleaning, ARIMA forecasting, status
//! classification and price data access.
//!
//! - Domain types (instruments, raw and cleaned close series)
//! - Series cleaner (windowing + numeric coercion)
//! - ARIMA model fitted by conditional sum of squares
//! - Forecast engine with length gate and degenerate fallback
//! - Status classifier
//! - Data providers (Yahoo, CSV, synthetic), circuit breaker, Parquet cache

pub mod clean;
pub mod data;
pub mod domain;
pub mod forecast;
pub mod model;
pub mod status;

pub use clean::clean;
pub use forecast::{round2, Forecast, ForecastEngine, ForecastOutcome, ForecastSettings};
pub use status::{classify, ProcessingPath, Status};
