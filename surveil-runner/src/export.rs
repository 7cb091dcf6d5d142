//! Export of the screening table: CSV, JSON and a plain-text table.
//!
//! Missing values are an empty cell in CSV, `null` in JSON and `-` in text.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::row::{ScreeningRow, COLUMNS};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(rows: &[ScreeningRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("failed to serialize screening rows to JSON")
}

pub fn import_json(json: &str) -> Result<Vec<ScreeningRow>> {
    serde_json::from_str(json).context("failed to deserialize screening rows from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

pub fn export_csv(rows: &[ScreeningRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.write_record(row.cells().iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Text table ─────────────────────────────────────────────────────

/// Column-aligned table; text columns left-aligned, numbers right-aligned.
pub fn render_table(rows: &[ScreeningRow]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            r.cells()
                .into_iter()
                .map(|c| c.unwrap_or_else(|| "-".to_string()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let is_text = |i: usize| i < 2 || i == COLUMNS.len() - 1;
    let line = |values: Vec<&str>| {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let pad = widths[i].saturating_sub(v.chars().count());
                if is_text(i) {
                    format!("{v}{}", " ".repeat(pad))
                } else {
                    format!("{}{v}", " ".repeat(pad))
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(COLUMNS.to_vec());
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

// ─── File export ────────────────────────────────────────────────────

/// Write rows to `path`; the format follows the extension (`.csv` / `.json`).
pub fn write_export(rows: &[ScreeningRow], path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let body = match ext.as_deref() {
        Some("csv") => export_csv(rows)?,
        Some("json") => export_json(rows)?,
        _ => bail!(
            "unsupported export format for {} (use .csv or .json)",
            path.display()
        ),
    };
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
