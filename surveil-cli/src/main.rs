//! Surveil CLI: screen, universe and cache management commands.
//!
//! Commands:
//! - `screen`: run the ARIMA screen over the universe and print the table
//! - `universe`: print the built-in universe as TOML
//! - `cache status`: report cached symbols, ranges and ages
//! - `cache clear`: remove cached series

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surveil_core::data::{
    CircuitBreaker, CsvProvider, DataProvider, ParquetSeriesCache, SyntheticProvider, Universe,
    YahooProvider,
};
use surveil_runner::config::{ALLOWED_HORIZONS, ALLOWED_WINDOWS};
use surveil_runner::{
    render_table, write_export, CachedSource, FitCache, LoadOptions, ScreenConfig,
    ScreeningPipeline,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surveil", about = "Surveil: ARIMA forecast screener")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen the universe and print one row per instrument.
    Screen {
        /// Path to a TOML config file (universe and run parameters).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trailing observations used per instrument: 120, 360 or 720.
        #[arg(long, value_parser = parse_window)]
        window: Option<usize>,

        /// Steps ahead to forecast: 30, 60 or 120.
        #[arg(long, value_parser = parse_horizon)]
        horizon: Option<usize>,

        /// Where prices come from.
        #[arg(long, value_enum, default_value_t = Source::Yahoo)]
        source: Source,

        /// Directory of `{SYMBOL}.csv` files (with --source csv).
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Series cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Offline mode: cached series only, no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic series when real data is unavailable.
        #[arg(long, default_value_t = false)]
        synthetic_fallback: bool,

        /// Process instruments in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Write the table to a .csv or .json file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the built-in universe as TOML.
    Universe,
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, ranges and ages.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove every cached series.
    Clear {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Screen {
            config,
            window,
            horizon,
            source,
            csv_dir,
            cache_dir,
            offline,
            synthetic_fallback,
            parallel,
            export,
        } => run_screen(ScreenArgs {
            config,
            window,
            horizon,
            source,
            csv_dir,
            cache_dir,
            offline,
            synthetic_fallback,
            parallel,
            export,
        }),
        Commands::Universe => run_universe(),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clear { cache_dir, confirm } => run_cache_clear(&cache_dir, confirm),
        },
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug,reqwest=warn,hyper=warn"
    } else {
        "info,reqwest=warn,hyper=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_window(s: &str) -> Result<usize, String> {
    parse_choice(s, &ALLOWED_WINDOWS)
}

fn parse_horizon(s: &str) -> Result<usize, String> {
    parse_choice(s, &ALLOWED_HORIZONS)
}

fn parse_choice(s: &str, allowed: &[usize]) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not one of {allowed:?}"))
    }
}

struct ScreenArgs {
    config: Option<PathBuf>,
    window: Option<usize>,
    horizon: Option<usize>,
    source: Source,
    csv_dir: Option<PathBuf>,
    cache_dir: PathBuf,
    offline: bool,
    synthetic_fallback: bool,
    parallel: bool,
    export: Option<PathBuf>,
}

fn run_screen(args: ScreenArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ScreenConfig::from_file(path)?,
        None => ScreenConfig::default(),
    };
    if let Some(window) = args.window {
        config.historical_window = window;
    }
    if let Some(horizon) = args.horizon {
        config.forecast_horizon = horizon;
    }
    config.validate()?;

    let provider: Box<dyn DataProvider> = match args.source {
        Source::Yahoo => Box::new(YahooProvider::new(Arc::new(
            CircuitBreaker::default_provider(),
        ))?),
        Source::Csv => {
            let Some(dir) = &args.csv_dir else {
                bail!("--source csv requires --csv-dir");
            };
            Box::new(CsvProvider::new(dir))
        }
        Source::Synthetic => Box::new(SyntheticProvider),
    };
    let cache = match args.source {
        Source::Synthetic => None,
        _ => Some(ParquetSeriesCache::new(&args.cache_dir)),
    };
    let opts = LoadOptions {
        ttl: config.cache.ttl(),
        offline: args.offline,
        synthetic_fallback: args.synthetic_fallback,
    };
    let source = CachedSource::new(provider, cache, opts);

    let pipeline = ScreeningPipeline::from_config(Arc::new(source), &config)
        .with_fit_cache(Arc::new(FitCache::new(config.cache.ttl())))
        .with_parallel(args.parallel);

    let universe = config.universe();
    let rows = pipeline.run(
        &universe.instruments,
        config.historical_window,
        config.forecast_horizon,
    )?;

    println!(
        "ARIMA{} screen: window {}, horizon {}, history {}",
        config.model.order(),
        config.historical_window,
        config.forecast_horizon,
        pipeline.range()
    );
    println!();
    print!("{}", render_table(&rows));

    if let Some(path) = &args.export {
        write_export(&rows, path)?;
        println!("\nExported {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}

fn run_universe() -> Result<()> {
    let toml = Universe::default_screen()
        .to_toml()
        .map_err(anyhow::Error::msg)?;
    print!("{toml}");
    Ok(())
}

/// Symbols with a `symbol=` directory under `cache_dir`, sorted.
fn cached_symbols(cache_dir: &Path) -> Result<Vec<String>> {
    let mut symbols = Vec::new();
    for entry in std::fs::read_dir(cache_dir)
        .with_context(|| format!("read cache dir {}", cache_dir.display()))?
    {
        let name = entry?.file_name().to_string_lossy().to_string();
        if let Some(symbol) = name.strip_prefix("symbol=") {
            symbols.push(symbol.to_string());
        }
    }
    symbols.sort();
    Ok(symbols)
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let symbols = cached_symbols(cache_dir)?;
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetSeriesCache::new(cache_dir);
    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let total_size: u64 = symbols
        .iter()
        .map(|s| dir_size(&cache_dir.join(format!("symbol={s}"))))
        .sum();

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<8} {:<25} {:>8} {:>10}", "Symbol", "Range", "Rows", "Age");
    println!("{}", "-".repeat(54));
    for status in cache.status(&refs) {
        let range = status
            .range
            .map(|r| r.to_string())
            .unwrap_or_else(|| "(no meta)".into());
        let rows = status
            .observation_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into());
        let age = status
            .age_secs
            .map(format_age)
            .unwrap_or_else(|| "-".into());
        println!("{:<8} {:<25} {:>8} {:>10}", status.symbol, range, rows, age);
    }
    Ok(())
}

fn run_cache_clear(cache_dir: &Path, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let symbols = cached_symbols(cache_dir)?;
    if !confirm {
        println!(
            "Would remove {} cached symbols: {}",
            symbols.len(),
            symbols.join(", ")
        );
        println!("Re-run with --confirm to delete.");
        return Ok(());
    }
    let removed = ParquetSeriesCache::new(cache_dir).clear()?;
    println!("Removed {removed} cached symbols from {}", cache_dir.display());
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

fn format_age(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn window_and_horizon_parsers() {
        assert_eq!(parse_window("360"), Ok(360));
        assert!(parse_window("100").is_err());
        assert!(parse_window("abc").is_err());
        assert_eq!(parse_horizon("120"), Ok(120));
        assert!(parse_horizon("90").is_err());
    }

    #[test]
    fn screen_flags_parse() {
        let cli = Cli::try_parse_from([
            "surveil", "screen", "--window", "720", "--horizon", "60", "--source", "csv",
            "--csv-dir", "prices", "--parallel",
        ])
        .unwrap();
        let Commands::Screen {
            window,
            horizon,
            source,
            parallel,
            ..
        } = cli.command
        else {
            panic!("expected screen");
        };
        assert_eq!((window, horizon, parallel), (Some(720), Some(60), true));
        assert!(matches!(source, Source::Csv));
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_age(90), "1m");
        assert_eq!(format_age(7200), "2h");
    }
}
