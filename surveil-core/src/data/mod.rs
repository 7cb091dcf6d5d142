//! Price data: providers, circuit breaker, series cache, universe.

pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, ParquetSeriesCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult, HistoryRange};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;
pub use yahoo::YahooProvider;
