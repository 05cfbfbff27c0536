//! Run counters and the end-of-run summary
//!
//! Counters are shared by every worker of a stage and updated atomically.
//! The summary is printed once the stage has drained.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Which pipeline stage produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Listing pages to detail links
    Links,
    /// Detail links to business records
    Details,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Links => write!(f, "links"),
            Stage::Details => write!(f, "details"),
        }
    }
}

/// Per-URL outcome counters
#[derive(Debug, Default)]
pub struct ScrapeCounters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl CounterSnapshot {
    /// URLs that have finished, either way
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }
}

impl ScrapeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of one stage run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stage: Stage,

    /// Distinct input URLs
    pub total_urls: u64,

    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// Rows persisted to the output file
    pub rows_written: u64,

    /// Output batches that could not be written
    pub failed_batches: u64,

    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Elapsed time as whole minutes and remaining seconds
    pub fn minutes_seconds(&self) -> (u64, u64) {
        let secs = self.elapsed.as_secs();
        (secs / 60, secs % 60)
    }
}

/// Prints a summary to stdout
pub fn print_summary(summary: &RunSummary) {
    let (minutes, seconds) = summary.minutes_seconds();

    println!("=== {} stage ===", summary.stage);
    println!(
        "Started at {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Completed in {} min {} sec", minutes, seconds);
    println!(
        "Failed to scrape {} of {} URLs",
        summary.failed, summary.total_urls
    );
    println!("Rows written: {}", summary.rows_written);

    if summary.failed_batches > 0 {
        println!("Output batches lost: {}", summary.failed_batches);
    }
}
