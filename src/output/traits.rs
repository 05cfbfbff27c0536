//! Row traits and the row types written by each stage
//!
//! This module defines how produced data maps onto CSV rows.

use crate::crawler::{BusinessRecord, DetailLink};

/// A value that can be written as one CSV row
///
/// Implementations must be thread-safe; rows are produced on worker tasks and
/// handed to a single collector.
pub trait CsvRow: Send + 'static {
    /// Column names, written when the output file is new
    const HEADER: &'static [&'static str];

    /// Field values in `HEADER` order
    fn fields(&self) -> Vec<String>;

    /// Identity used to drop duplicate rows, or `None` to keep every row
    fn dedupe_key(&self) -> Option<String> {
        None
    }
}

impl CsvRow for DetailLink {
    const HEADER: &'static [&'static str] = &["Scraped URLs"];

    fn fields(&self) -> Vec<String> {
        vec![self.url.clone()]
    }

    fn dedupe_key(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

/// Business records are never merged, so every row is kept
impl CsvRow for BusinessRecord {
    const HEADER: &'static [&'static str] =
        &["Phone", "Name", "Email(s)", "Website-Host", "Instagram-URL"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.phone.clone(),
            self.name.clone(),
            self.joined_emails(),
            self.website_host.clone(),
            self.social_url.clone(),
        ]
    }
}
