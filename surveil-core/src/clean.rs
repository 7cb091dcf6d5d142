//! Series cleaning: raw provider output → numeric, gap-free close series.
//!
//! The window is applied first (the most recent `window` raw observations),
//! then each close is coerced to a finite number. Entries that fail coercion
//! are dropped; nothing is interpolated.

use crate::domain::{CleanSeries, RawClose, RawSeries};

/// Clean the tail `window` observations of `raw`.
///
/// Returns `None` when no valid close remains, or when the source carried no
/// close field. That is a reportable condition, not an error.
pub fn clean(raw: &RawSeries, window: usize) -> Option<CleanSeries> {
    if !raw.has_close {
        return None;
    }

    let values: Vec<f64> = raw
        .tail(window)
        .iter()
        .filter_map(|obs| obs.close.as_ref().and_then(RawClose::coerce))
        .collect();

    CleanSeries::new(values)
}
