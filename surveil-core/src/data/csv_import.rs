//! CSV import provider.
//!
//! Reads `{dir}/{SYMBOL}.csv` with a header row. The `Date` column is
//! required; the `Close` column is optional (a file without one yields a
//! series flagged as having no close field). Close cells are kept as raw text
//! so that cleaning decides what is numeric.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRange};
use crate::domain::{RawClose, RawObservation, RawSeries};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Reads `<dir>/<SYMBOL>.csv` files with `Date` and `Close` columns.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Parse a price file, keeping observations inside `range`.
    pub fn read_file(path: &Path, range: &HistoryRange) -> Result<RawSeries, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DataError::Other(format!("open {}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| DataError::ResponseFormatChanged(format!("header row: {e}")))?
            .clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let date_idx = find("date")
            .ok_or_else(|| DataError::ResponseFormatChanged("missing 'Date' column".into()))?;
        let close_idx = find("close");

        let mut observations = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| DataError::ResponseFormatChanged(format!("row {}: {e}", line + 2)))?;
            let raw_date = record.get(date_idx).unwrap_or_default().trim();
            let date = parse_date(raw_date).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("row {}: bad date '{raw_date}'", line + 2))
            })?;
            if date < range.start || date > range.end {
                continue;
            }
            let close = close_idx
                .and_then(|i| record.get(i))
                .filter(|cell| !cell.trim().is_empty())
                .map(|cell| RawClose::Text(cell.to_string()));
            observations.push(RawObservation { date, close });
        }
        observations.sort_by_key(|o| o.date);

        Ok(if close_idx.is_some() {
            RawSeries::new(observations)
        } else {
            RawSeries::without_close(observations.into_iter().map(|o| o.date))
        })
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let series = Self::read_file(&path, range)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
