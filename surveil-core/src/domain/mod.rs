//! Domain types for the screener

pub mod instrument;
pub mod series;

pub use instrument::Instrument;
pub use series::{CleanSeries, RawClose, RawObservation, RawSeries};
