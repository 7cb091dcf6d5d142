//! Synthetic price provider for development and offline runs.
//!
//! Produces a weekday random walk from 100.0, seeded from the symbol name so
//! the same symbol and range always give the same series. Results built on it
//! are tagged with [`DataSource::Synthetic`].

use super::provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRange};
use crate::domain::{RawClose, RawObservation, RawSeries};
use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic random-walk closes, seeded per symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn generate(symbol: &str, range: &HistoryRange) -> RawSeries {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut observations = Vec::new();
        let mut price = 100.0_f64;
        let mut current = range.start;
        while current <= range.end {
            if !matches!(current.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
                let daily_return: f64 = rng.gen_range(-0.03..0.03);
                price *= 1.0 + daily_return;
                observations.push(RawObservation {
                    date: current,
                    close: Some(RawClose::Number(price)),
                });
            }
            current += chrono::Duration::days(1);
        }
        RawSeries::new(observations)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, range: &HistoryRange) -> Result<FetchResult, DataError> {
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series: Self::generate(symbol, range),
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn january() -> HistoryRange {
        HistoryRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = SyntheticProvider::generate("NVDA", &january());
        let b = SyntheticProvider::generate("NVDA", &january());
        let c = SyntheticProvider::generate("TSLA", &january());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn weekdays_only() {
        let s = SyntheticProvider::generate("X", &january());
        assert_eq!(s.len(), 23);
        assert!(s
            .observations
            .iter()
            .all(|o| o.date.weekday().number_from_monday() <= 5));
    }
}
