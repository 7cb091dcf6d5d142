//! Raw and cleaned close-price series.
//!
//! A [`RawSeries`] is whatever the data collaborator handed back: dated
//! observations whose close may be a number, an unparsed text cell, or
//! missing. A [`CleanSeries`] is the numeric, gap-free view the model works on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A close value as received from a provider, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawClose {
    Number(f64),
    Text(String),
}

impl RawClose {
    /// Coerce to a finite `f64`. Text is parsed after trimming whitespace.
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            RawClose::Number(v) => *v,
            RawClose::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawClose {
    fn from(v: f64) -> Self {
        RawClose::Number(v)
    }
}

impl From<&str> for RawClose {
    fn from(s: &str) -> Self {
        RawClose::Text(s.to_string())
    }
}

/// One dated observation of a raw series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub close: Option<RawClose>,
}

/// Time-ordered raw series for a single symbol, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSeries {
    pub observations: Vec<RawObservation>,
    /// False when the source had no close-price field at all.
    pub has_close: bool,
}

impl RawSeries {
    pub fn new(observations: Vec<RawObservation>) -> Self {
        Self {
            observations,
            has_close: true,
        }
    }

    /// An empty series (provider returned nothing).
    pub fn empty() -> Self {
        Self {
            observations: Vec::new(),
            has_close: true,
        }
    }

    /// Dates are known but the source carried no close column.
    pub fn without_close(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            observations: dates
                .into_iter()
                .map(|date| RawObservation { date, close: None })
                .collect(),
            has_close: false,
        }
    }

    /// Build a series of consecutive daily observations starting at `start`.
    pub fn from_closes<C, I>(start: NaiveDate, closes: I) -> Self
    where
        C: Into<RawClose>,
        I: IntoIterator<Item = Option<C>>,
    {
        let observations = closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| RawObservation {
                date: start + chrono::Duration::days(i as i64),
                close: close.map(Into::into),
            })
            .collect();
        Self::new(observations)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The most recent `window` observations (all of them if shorter).
    pub fn tail(&self, window: usize) -> &[RawObservation] {
        let start = self.observations.len().saturating_sub(window);
        &self.observations[start..]
    }

    /// Coerced close of the final observation, before any windowing or cleaning.
    pub fn last_close(&self) -> Option<f64> {
        if !self.has_close {
            return None;
        }
        self.observations
            .last()
            .and_then(|obs| obs.close.as_ref())
            .and_then(RawClose::coerce)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }
}

/// Numeric close prices, most recent last.
///
/// Invariant: never empty, every element finite.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    values: Vec<f64>,
}

impl CleanSeries {
    /// Returns `None` for an empty input or one holding non-finite values.
    pub fn new(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// BLAKE3 over the little-endian bytes of every value.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for v in &self.values {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn coerce_numbers_and_text() {
        assert_eq!(RawClose::Number(12.5).coerce(), Some(12.5));
        assert_eq!(RawClose::Text(" 101.25 ".into()).coerce(), Some(101.25));
        assert_eq!(RawClose::Text("n/a".into()).coerce(), None);
        assert_eq!(RawClose::Text("".into()).coerce(), None);
    }

    #[test]
    fn coerce_rejects_non_finite() {
        assert_eq!(RawClose::Number(f64::NAN).coerce(), None);
        assert_eq!(RawClose::Number(f64::INFINITY).coerce(), None);
        assert_eq!(RawClose::Text("NaN".into()).coerce(), None);
        assert_eq!(RawClose::Text("inf".into()).coerce(), None);
    }

    #[test]
    fn raw_close_deserializes_untagged() {
        let n: RawClose = serde_json::from_str("3.5").unwrap();
        let t: RawClose = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(n, RawClose::Number(3.5));
        assert_eq!(t, RawClose::Text("abc".into()));
    }

    #[test]
    fn tail_clamps_to_length() {
        let raw = RawSeries::from_closes(day(1), [Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(raw.tail(2).len(), 2);
        assert_eq!(raw.tail(10).len(), 3);
        assert_eq!(raw.tail(2)[0].date, day(2));
    }

    #[test]
    fn last_close_reads_final_raw_entry() {
        let raw = RawSeries::from_closes(day(1), [Some(1.0), Some(2.0)]);
        assert_eq!(raw.last_close(), Some(2.0));

        let trailing_gap = RawSeries::from_closes(day(1), [Some(1.0), None::<f64>]);
        assert_eq!(trailing_gap.last_close(), None);

        let no_field = RawSeries::without_close([day(1), day(2)]);
        assert_eq!(no_field.last_close(), None);
    }

    #[test]
    fn clean_series_rejects_empty_and_non_finite() {
        assert!(CleanSeries::new(vec![]).is_none());
        assert!(CleanSeries::new(vec![1.0, f64::NAN]).is_none());
        assert!(CleanSeries::new(vec![1.0]).is_some());
    }

    #[test]
    fn clean_series_stats() {
        let s = CleanSeries::new(vec![3.0, 1.0, 2.0, 6.0]).unwrap();
        assert_eq!(s.last(), 6.0);
        assert_eq!(s.min(), 1.0);
        assert_eq!(s.max(), 6.0);
        assert_eq!(s.mean(), 3.0);
    }

    #[test]
    fn content_hash_is_value_sensitive() {
        let a = CleanSeries::new(vec![1.0, 2.0]).unwrap();
        let b = CleanSeries::new(vec![1.0, 2.0]).unwrap();
        let c = CleanSeries::new(vec![1.0, 2.5]).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
