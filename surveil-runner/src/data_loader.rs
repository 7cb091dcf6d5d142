//! Series resolution for the pipeline.
//!
//! [`CachedSource`] wraps a provider with the Parquet series cache and
//! implements the fallback policy:
//! 1. Fresh cache entry for the same range → use it (offline: any cached
//!    entry, whatever its range or age)
//! 2. Otherwise, if online and the provider is available → fetch and cache
//! 3. If that fails and synthetic fallback is enabled → synthetic series (tagged)
//! 4. Otherwise → the provider's error (or an offline miss)
//!
//! "Symbol not found" is passed through untouched so the pipeline can report
//! it as missing data rather than a failure.

use std::time::Duration;
use surveil_core::data::{
    DataError, DataProvider, DataSource, FetchResult, HistoryRange, ParquetSeriesCache,
    SyntheticProvider,
};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and no network access (use --synthetic-fallback for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl From<LoadError> for DataError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::Data(inner) => inner,
            other @ LoadError::NoCachedDataOffline { .. } => DataError::Other(other.to_string()),
        }
    }
}

/// Options controlling how series are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Lifetime of a cached series.
    pub ttl: Duration,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic series when real data is unavailable.
    pub synthetic_fallback: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            offline: false,
            synthetic_fallback: false,
        }
    }
}

/// A provider wrapped with the series cache and the fallback policy.
pub struct CachedSource<P> {
    provider: P,
    cache: Option<ParquetSeriesCache>,
    opts: LoadOptions,
}

impl<P: DataProvider> CachedSource<P> {
    /// Wrap `provider`. Without a cache every load goes to the provider.
    pub fn new(provider: P, cache: Option<ParquetSeriesCache>, opts: LoadOptions) -> Self {
        Self {
            provider,
            cache,
            opts,
        }
    }

    pub fn load(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, LoadError> {
        if let Some(cache) = &self.cache {
            let cached = if self.opts.offline {
                cache.load_any(symbol)
            } else {
                cache.load_fresh(symbol, range, self.opts.ttl)
            };
            match cached {
                Ok(Some(series)) => {
                    tracing::debug!(symbol, "series cache hit");
                    return Ok(FetchResult {
                        symbol: symbol.to_string(),
                        series,
                        source: DataSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(symbol, error = %e, "series cache unreadable"),
            }
        }

        let fetch_error = if self.opts.offline {
            None
        } else if !self.provider.is_available() {
            Some(DataError::CircuitBreakerTripped)
        } else {
            match self.provider.fetch(symbol, range) {
                Ok(fetched) => {
                    self.write_through(symbol, range, &fetched);
                    return Ok(fetched);
                }
                Err(e) => Some(e),
            }
        };

        match fetch_error {
            Some(e @ DataError::SymbolNotFound { .. }) => Err(LoadError::Data(e)),
            _ if self.opts.synthetic_fallback => {
                tracing::warn!(symbol, "generating synthetic data; results are tagged as synthetic");
                Ok(SyntheticProvider.fetch(symbol, range)?)
            }
            Some(e) => {
                tracing::warn!(symbol, provider = self.provider.name(), error = %e, "fetch failed");
                Err(LoadError::Data(e))
            }
            None => Err(LoadError::NoCachedDataOffline {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn write_through(&self, symbol: &str, range: &HistoryRange, fetched: &FetchResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        if fetched.series.is_empty() {
            return;
        }
        if let Err(e) = cache.write(symbol, range, &fetched.series, fetched.source) {
            tracing::warn!(symbol, error = %e, "failed to cache series");
        }
    }
}

impl<P: DataProvider> DataProvider for CachedSource<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn fetch(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, DataError> {
        Ok(self.load(symbol, range)?)
    }

    fn is_available(&self) -> bool {
        self.cache.is_some() || self.provider.is_available() || self.opts.synthetic_fallback
    }
}
