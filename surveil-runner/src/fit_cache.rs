//! In-memory memo of model fits.
//!
//! Keyed by the content hash of the cleaned series, the forecast horizon and
//! the model settings, so identical input within the TTL skips the fit.
//! Shared across worker threads behind a mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use surveil_core::domain::CleanSeries;
use surveil_core::model::ArimaOrder;
use surveil_core::{Forecast, ForecastSettings};

/// Identity of one fit: series content, horizon and model settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FitKey {
    series_hash: String,
    horizon: usize,
    order: ArimaOrder,
    min_for_model: usize,
    confidence_bits: u64,
}

impl FitKey {
    pub fn new(series: &CleanSeries, horizon: usize, settings: &ForecastSettings) -> Self {
        Self {
            series_hash: series.content_hash(),
            horizon,
            order: settings.order,
            min_for_model: settings.min_for_model,
            confidence_bits: settings.confidence_level.to_bits(),
        }
    }
}

/// Thread-safe TTL map from [`FitKey`] to a finished [`Forecast`].
#[derive(Debug)]
pub struct FitCache {
    entries: Mutex<HashMap<FitKey, (Instant, Forecast)>>,
    ttl: Duration,
}

impl FitCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FitKey, (Instant, Forecast)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unexpired entry for `key`. Expired entries are dropped on the way.
    pub fn get(&self, key: &FitKey) -> Option<Forecast> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((stored, forecast)) if stored.elapsed() < self.ttl => Some(forecast.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `forecast` under `key`, dropping every expired entry first.
    pub fn insert(&self, key: FitKey, forecast: Forecast) {
        let mut entries = self.lock();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), forecast));
    }

    /// Cached value or `compute()`, storing the result.
    pub fn get_or_insert_with<F>(&self, key: FitKey, compute: F) -> Forecast
    where
        F: FnOnce() -> Forecast,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!("fit cache hit");
            return hit;
        }
        // Computed outside the lock so parallel workers don't serialise on fits.
        let forecast = compute();
        self.insert(key, forecast.clone());
        forecast
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
