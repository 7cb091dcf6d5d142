//! Surveil Runner: screening orchestration, run configuration, caching, export.
//!
//! This crate builds on `surveil-core` to provide:
//! - The screening pipeline (one row per instrument, failures isolated)
//! - TOML run configuration with the universe
//! - Series loading with cache / provider / synthetic fallback
//! - An in-memory memo of model fits
//! - CSV, JSON and text-table export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fit_cache;
pub mod pipeline;
pub mod row;

pub use config::{CacheConfig, ConfigError, ModelConfig, ScreenConfig, Thresholds};
pub use data_loader::{CachedSource, LoadError, LoadOptions};
pub use export::{export_csv, export_json, import_json, render_table, write_export};
pub use fit_cache::{FitCache, FitKey};
pub use pipeline::{PipelineError, ScreeningPipeline};
pub use row::{delta_pct, ScreeningRow, COLUMNS};
