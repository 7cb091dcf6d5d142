//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Yahoo Finance, CSV
//! import, synthetic) so the pipeline can swap implementations and tests can
//! inject fixed series.

use crate::domain::RawSeries;
use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Inclusive calendar range of daily history to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `years` years up to and including `end`.
    pub fn years_ending(end: NaiveDate, years: u32) -> Self {
        let start = end
            .checked_sub_months(Months::new(12 * years))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// The `years` years up to today (UTC).
    pub fn last_years(years: u32) -> Self {
        Self::years_ending(Utc::now().date_naive(), years)
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub series: RawSeries,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Cache,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataSource::YahooFinance => "yahoo",
            DataSource::CsvImport => "csv",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Trait for price-history providers.
///
/// Implementations handle the specifics of one source. Caching sits above this
/// trait; providers don't know about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for a symbol over a date range.
    fn fetch(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

impl<T: DataProvider + ?Sized> DataProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, DataError> {
        (**self).fetch(symbol, range)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
