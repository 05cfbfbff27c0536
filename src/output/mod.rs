//! Output module for persisting scraped rows and reporting runs
//!
//! This module handles:
//! - Mapping produced data onto CSV rows
//! - Batched, thread-safe CSV writing
//! - Run counters and the final summary
//! - Reading a link file back as detail-stage input

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::{CsvSink, SinkOptions};
pub use stats::{print_summary, CounterSnapshot, RunSummary, ScrapeCounters, Stage};
pub use traits::CsvRow;

use crate::HarvestError;
use std::path::Path;

/// Reads the URLs of a link file written by the links stage
///
/// The first column of each row is taken. Blank rows and a leading header row
/// (any first cell that is not an http(s) URL) are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid CSV.
pub fn read_link_file(path: &Path) -> Result<Vec<String>, HarvestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut urls = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let Some(cell) = record.get(0).map(str::trim) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        if !(cell.starts_with("http://") || cell.starts_with("https://")) {
            if index > 0 {
                tracing::warn!("Skipping non-URL entry in {}: {}", path.display(), cell);
            }
            continue;
        }
        urls.push(cell.to_string());
    }

    tracing::info!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}
