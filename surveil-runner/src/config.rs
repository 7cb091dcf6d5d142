//! Serializable screening configuration.
//!
//! One TOML file holds the run parameters and the universe:
//!
//! ```toml
//! historical_window = 120
//! forecast_horizon = 30
//!
//! [model]
//! p = 2
//! d = 0
//! q = 2
//!
//! [[instrument]]
//! name = "NVIDIA"
//! symbol = "NVDA"
//! ```
//!
//! Every field has a default; an absent instrument list means the built-in
//! universe.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use surveil_core::data::Universe;
use surveil_core::domain::Instrument;
use surveil_core::model::ArimaOrder;
use surveil_core::ForecastSettings;
use thiserror::Error;

/// Trailing observation counts a screen may use.
pub const ALLOWED_WINDOWS: [usize; 3] = [120, 360, 720];

/// Forecast horizons, in steps, a screen may use.
pub const ALLOWED_HORIZONS: [usize; 3] = [30, 60, 120];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("historical window {0} not supported (expected one of 120, 360, 720)")]
    UnsupportedWindow(usize),

    #[error("forecast horizon {0} not supported (expected one of 30, 60, 120)")]
    UnsupportedHorizon(usize),

    #[error("confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidence(f64),

    #[error("thresholds out of order: min_for_model ({min_for_model}) must be ≥ 1 and ≤ min_usable ({min_usable})")]
    InvalidThresholds {
        min_for_model: usize,
        min_usable: usize,
    },

    #[error("instrument #{index} has an empty symbol")]
    EmptySymbol { index: usize },
}

/// Fixed ARIMA order and interval confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub confidence_level: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let order = ArimaOrder::default();
        Self {
            p: order.p,
            d: order.d,
            q: order.q,
            confidence_level: 0.95,
        }
    }
}

impl ModelConfig {
    pub fn order(&self) -> ArimaOrder {
        ArimaOrder::new(self.p, self.d, self.q)
    }
}

/// Cleaned-length thresholds that decide how an instrument is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this the model is never attempted (degenerate outcome).
    pub min_for_model: usize,
    /// Below this (and at or above `min_for_model`) the instrument is
    /// reported as having insufficient data.
    pub min_usable: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_for_model: 10,
            min_usable: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached price series and model fits.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Complete configuration of one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub historical_window: usize,
    pub forecast_horizon: usize,
    /// Years of daily history requested from the provider.
    pub history_years: u32,
    pub model: ModelConfig,
    pub thresholds: Thresholds,
    pub cache: CacheConfig,
    #[serde(rename = "instrument")]
    pub instruments: Vec<Instrument>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            historical_window: 120,
            forecast_horizon: 30,
            history_years: 5,
            model: ModelConfig::default(),
            thresholds: Thresholds::default(),
            cache: CacheConfig::default(),
            instruments: Vec::new(),
        }
    }
}

impl ScreenConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ALLOWED_WINDOWS.contains(&self.historical_window) {
            return Err(ConfigError::UnsupportedWindow(self.historical_window));
        }
        if !ALLOWED_HORIZONS.contains(&self.forecast_horizon) {
            return Err(ConfigError::UnsupportedHorizon(self.forecast_horizon));
        }
        let c = self.model.confidence_level;
        if !(c > 0.0 && c < 1.0) {
            return Err(ConfigError::InvalidConfidence(c));
        }
        let t = self.thresholds;
        if t.min_for_model == 0 || t.min_for_model > t.min_usable {
            return Err(ConfigError::InvalidThresholds {
                min_for_model: t.min_for_model,
                min_usable: t.min_usable,
            });
        }
        if let Some(index) = self
            .instruments
            .iter()
            .position(|i| i.symbol.trim().is_empty())
        {
            return Err(ConfigError::EmptySymbol { index });
        }
        Ok(())
    }

    /// Configured instruments, or the built-in universe when none are listed.
    pub fn universe(&self) -> Universe {
        if self.instruments.is_empty() {
            Universe::default_screen()
        } else {
            Universe::new(self.instruments.clone())
        }
    }

    pub fn forecast_settings(&self) -> ForecastSettings {
        ForecastSettings {
            order: self.model.order(),
            min_for_model: self.thresholds.min_for_model,
            confidence_level: self.model.confidence_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_takes_defaults() {
        let cfg = ScreenConfig::from_toml("").unwrap();
        assert_eq!(cfg, ScreenConfig::default());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.universe().len(), 8);
        assert_eq!(cfg.forecast_settings(), ForecastSettings::default());
    }

    #[test]
    fn parses_full_file() {
        let cfg = ScreenConfig::from_toml(
            r#"
            historical_window = 360
            forecast_horizon = 60
            history_years = 3

            [model]
            p = 1
            d = 1
            q = 0
            confidence_level = 0.8

            [thresholds]
            min_for_model = 12
            min_usable = 30

            [cache]
            ttl_secs = 60

            [[instrument]]
            name = "TESLA"
            symbol = "TSLA"
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.model.order(), ArimaOrder::new(1, 1, 0));
        assert_eq!(cfg.thresholds.min_usable, 30);
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(60));
        assert_eq!(cfg.universe().symbols(), vec!["TSLA"]);
    }

    #[test]
    fn partial_model_section_keeps_other_defaults() {
        let cfg = ScreenConfig::from_toml("[model]\nq = 1\n").unwrap();
        assert_eq!(cfg.model.order(), ArimaOrder::new(2, 0, 1));
        assert_eq!(cfg.model.confidence_level, 0.95);
    }

    #[test]
    fn rejects_unsupported_window_and_horizon() {
        let cfg = ScreenConfig {
            historical_window: 100,
            ..ScreenConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsupportedWindow(100))));

        let cfg = ScreenConfig {
            forecast_horizon: 45,
            ..ScreenConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsupportedHorizon(45))));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = ScreenConfig {
            thresholds: Thresholds {
                min_for_model: 25,
                min_usable: 20,
            },
            ..ScreenConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidThresholds { .. })));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = ScreenConfig {
            instruments: Universe::default_screen().instruments,
            ..ScreenConfig::default()
        };
        let text = cfg.to_toml().unwrap();
        assert_eq!(ScreenConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ScreenConfig::from_file(Path::new("/nonexistent/surveil.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
