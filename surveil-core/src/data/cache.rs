//! Parquet cache for raw close series with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/series.parquet` + `meta.json`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Entries are keyed by retrieval range and expire after a TTL
//! - Integrity validation on load (schema check, row count matches sidecar)
//! - Quarantine for corrupt files (`series.parquet.quarantined`)

use super::provider::{DataError, DataSource, HistoryRange};
use crate::domain::{RawClose, RawObservation, RawSeries};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SERIES_FILE: &str = "series.parquet";
const META_FILE: &str = "meta.json";

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub range: HistoryRange,
    pub observation_count: usize,
    pub has_close: bool,
    pub data_hash: String,
    pub source: DataSource,
    /// UTC.
    pub cached_at: NaiveDateTime,
}

impl CacheMeta {
    pub fn age(&self) -> Duration {
        (Utc::now().naive_utc() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, range: &HistoryRange, ttl: Duration) -> bool {
        self.range == *range && self.age() < ttl
    }
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub range: Option<HistoryRange>,
    pub observation_count: Option<usize>,
    pub age_secs: Option<u64>,
}

/// Parquet-backed store of raw close series, one directory per symbol.
pub struct ParquetSeriesCache {
    cache_dir: PathBuf,
}

impl ParquetSeriesCache {
    /// Cache rooted at `cache_dir`. Nothing is created until the first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(SERIES_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    /// Store a fetched series. Empty series are never cached.
    pub fn write(
        &self,
        symbol: &str,
        range: &HistoryRange,
        series: &RawSeries,
        source: DataSource,
    ) -> Result<(), DataError> {
        if series.is_empty() {
            return Err(DataError::CacheError("no observations to cache".into()));
        }

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let df = series_to_dataframe(series)?;
        let path = self.series_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            range: *range,
            observation_count: series.len(),
            has_close: series.has_close,
            data_hash: hash_series(series)?,
            source,
            cached_at: Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        let meta_path = self.meta_path(symbol);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;
        fs::rename(&meta_tmp, &meta_path)
            .map_err(|e| DataError::CacheError(format!("meta rename: {e}")))?;

        tracing::debug!(symbol, observations = series.len(), "cached series");
        Ok(())
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Cached series for `symbol` if it was stored for the same range less
    /// than `ttl` ago. Corrupt entries are quarantined and reported as a miss.
    pub fn load_fresh(
        &self,
        symbol: &str,
        range: &HistoryRange,
        ttl: Duration,
    ) -> Result<Option<RawSeries>, DataError> {
        let Some(meta) = self.get_meta(symbol) else {
            return Ok(None);
        };
        if !meta.is_fresh(range, ttl) {
            tracing::debug!(symbol, "cache entry stale");
            return Ok(None);
        }
        self.load_validated(symbol, &meta)
    }

    /// Cached series for `symbol` regardless of range or age.
    ///
    /// Used when no network access is allowed. Integrity checks still apply.
    pub fn load_any(&self, symbol: &str) -> Result<Option<RawSeries>, DataError> {
        let Some(meta) = self.get_meta(symbol) else {
            return Ok(None);
        };
        self.load_validated(symbol, &meta)
    }

    fn load_validated(
        &self,
        symbol: &str,
        meta: &CacheMeta,
    ) -> Result<Option<RawSeries>, DataError> {
        let path = self.series_path(symbol);
        match load_and_validate(&path, meta) {
            Ok(series) => Ok(Some(series)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let quarantine = path.with_extension("parquet.quarantined");
                fs::rename(&path, &quarantine)?;
                let _ = fs::remove_file(self.meta_path(symbol));
                Ok(None)
            }
        }
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    range: meta.as_ref().map(|m| m.range),
                    observation_count: meta.as_ref().map(|m| m.observation_count),
                    age_secs: meta.as_ref().map(|m| m.age().as_secs()),
                }
            })
            .collect()
    }

    /// Remove every cached symbol. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, DataError> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_symbol_dir = path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("symbol="));
            if is_symbol_dir {
                fs::remove_dir_all(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn hash_series(series: &RawSeries) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(&series.observations)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Numbers land in `close`, text cells in `close_text`; both null = missing.
fn series_to_dataframe(series: &RawSeries) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let mut dates = Vec::with_capacity(series.len());
    let mut closes: Vec<Option<f64>> = Vec::with_capacity(series.len());
    let mut texts: Vec<Option<String>> = Vec::with_capacity(series.len());

    for obs in &series.observations {
        dates.push((obs.date - epoch).num_days() as i32);
        match &obs.close {
            Some(RawClose::Number(v)) => {
                closes.push(Some(*v));
                texts.push(None);
            }
            Some(RawClose::Text(s)) => {
                closes.push(None);
                texts.push(Some(s.clone()));
            }
            None => {
                closes.push(None);
                texts.push(None);
            }
        }
    }

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
        Column::new("close_text".into(), texts),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate(path: &Path, meta: &CacheMeta) -> Result<RawSeries, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() != meta.observation_count {
        return Err(DataError::CacheError(format!(
            "row count {} does not match sidecar {}",
            df.height(),
            meta.observation_count
        )));
    }

    let mut series = dataframe_to_series(&df)?;
    series.has_close = meta.has_close;
    if hash_series(&series)? != meta.data_hash {
        return Err(DataError::CacheError("content hash mismatch".into()));
    }
    Ok(series)
}

fn dataframe_to_series(df: &DataFrame) -> Result<RawSeries, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::CacheError(format!("missing column '{name}': {e}")))
    };

    let date_ca = column("date")?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let close_ca = column("close")?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;
    let text_ca = column("close_text")?
        .str()
        .map_err(|e| DataError::ParquetError(format!("close_text column type: {e}")))?;

    let epoch = epoch();
    let mut observations = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let close = match (text_ca.get(i), close_ca.get(i)) {
            (Some(text), _) => Some(RawClose::Text(text.to_string())),
            (None, Some(v)) => Some(RawClose::Number(v)),
            (None, None) => None,
        };
        observations.push(RawObservation {
            date: epoch + chrono::Duration::days(days as i64),
            close,
        });
    }
    Ok(RawSeries::new(observations))
}
