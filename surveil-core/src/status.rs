//! Per-instrument status classification.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    NoData,
    InsufficientData,
    TooShortForArima,
    ArimaFallback,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NoData => "NO_DATA",
            Status::InsufficientData => "INSUFFICIENT_DATA",
            Status::TooShortForArima => "TOO_SHORT_FOR_ARIMA",
            Status::ArimaFallback => "ARIMA_FALLBACK",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far an instrument got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPath {
    /// Nothing usable came back, or nothing survived cleaning.
    NoData,
    /// Cleaned, but below the usable threshold; model not attempted.
    Insufficient,
    /// Below the model gate; degenerate outcome.
    TooShort,
    Modelled,
    FitFailed,
    /// Any other failure for this instrument.
    Failed,
}

pub fn classify(path: ProcessingPath) -> Status {
    match path {
        ProcessingPath::NoData => Status::NoData,
        ProcessingPath::Insufficient => Status::InsufficientData,
        ProcessingPath::TooShort => Status::TooShortForArima,
        ProcessingPath::Modelled => Status::Ok,
        ProcessingPath::FitFailed => Status::ArimaFallback,
        ProcessingPath::Failed => Status::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for status in [
            Status::Ok,
            Status::NoData,
            Status::InsufficientData,
            Status::TooShortForArima,
            Status::ArimaFallback,
            Status::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn classify_each_path() {
        assert_eq!(classify(ProcessingPath::NoData), Status::NoData);
        assert_eq!(classify(ProcessingPath::Insufficient), Status::InsufficientData);
        assert_eq!(classify(ProcessingPath::TooShort), Status::TooShortForArima);
        assert_eq!(classify(ProcessingPath::Modelled), Status::Ok);
        assert_eq!(classify(ProcessingPath::FitFailed), Status::ArimaFallback);
        assert_eq!(classify(ProcessingPath::Failed), Status::Error);
    }

    #[test]
    fn parses_from_toml_string() {
        #[derive(Deserialize)]
        struct Wrap {
            status: Status,
        }
        let w: Wrap = toml::from_str("status = \"TOO_SHORT_FOR_ARIMA\"").unwrap();
        assert_eq!(w.status, Status::TooShortForArima);
    }
}
