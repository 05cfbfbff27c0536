//! Concurrent scrape coordination
//!
//! This module runs one pipeline stage over a set of URLs:
//! - Every distinct URL is spawned once onto a `JoinSet`
//! - A `WorkerPool` bounds how many are processed at once
//! - Workers report over a channel to a single collector, which owns the
//!   row deduplicator, updates the counters and appends to the sink
//! - Failed URLs are counted and logged; they never abort the run

use crate::crawler::fetcher::{FetchFailure, FetchResult, PageFetcher, PageSource};
use crate::crawler::parser::{DetailLink, Extractor};
use crate::crawler::scheduler::WorkerPool;
use crate::output::{CsvRow, CsvSink, RunSummary, ScrapeCounters, Stage};
use crate::url::{dedupe, Deduplicator};
use crate::HarvestError;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Turns one input URL into output rows
///
/// An `Err` marks the URL as failed. Handlers are shared by every worker of a
/// run.
pub trait UrlHandler: Send + Sync + 'static {
    type Row: CsvRow;

    fn handle(
        &self,
        url: String,
    ) -> impl Future<Output = Result<Vec<Self::Row>, FetchFailure>> + Send;
}

/// Link discovery: one listing URL to the detail links it carries
pub struct LinkDiscovery<S: PageSource> {
    fetcher: Arc<PageFetcher<S>>,
    extractor: Arc<Extractor>,
}

impl<S: PageSource> LinkDiscovery<S> {
    pub fn new(fetcher: Arc<PageFetcher<S>>, extractor: Arc<Extractor>) -> Self {
        Self { fetcher, extractor }
    }
}

impl<S: PageSource> UrlHandler for LinkDiscovery<S> {
    type Row = DetailLink;

    async fn handle(&self, url: String) -> Result<Vec<DetailLink>, FetchFailure> {
        match self.fetcher.fetch(&url).await {
            FetchResult::Success { body, .. } => Ok(self
                .extractor
                .detail_links(&body, &url)
                .into_iter()
                .map(DetailLink::new)
                .collect()),
            FetchResult::Failure { failure, .. } => Err(failure),
        }
    }
}

/// What a worker hands the collector
struct WorkerReport<R> {
    url: String,
    outcome: Result<Vec<R>, FetchFailure>,
}

/// Runs stages with bounded concurrency
pub struct Coordinator {
    pool: WorkerPool,
    counters: Arc<ScrapeCounters>,
}

impl Coordinator {
    /// Creates a coordinator; `concurrency == 0` means unbounded
    pub fn new(concurrency: usize) -> Self {
        Self {
            pool: WorkerPool::new(concurrency),
            counters: Arc::new(ScrapeCounters::new()),
        }
    }

    /// Counters shared with the workers
    pub fn counters(&self) -> Arc<ScrapeCounters> {
        self.counters.clone()
    }

    /// Processes every distinct URL and streams the rows into `sink`
    ///
    /// Returns once every spawned task has finished. Only a failure that makes
    /// the whole run meaningless is returned as an error; per-URL failures and
    /// lost output batches end up in the summary.
    pub async fn run<H: UrlHandler>(
        &self,
        stage: Stage,
        urls: Vec<String>,
        handler: Arc<H>,
        sink: &CsvSink<H::Row>,
    ) -> Result<RunSummary, HarvestError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let urls = dedupe(urls);
        let total = urls.len() as u64;

        match self.pool.size() {
            Some(size) => tracing::info!(
                "Starting {} stage: {} URLs, {} workers",
                stage,
                total,
                size
            ),
            None => tracing::info!("Starting {} stage: {} URLs, unbounded workers", stage, total),
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for url in urls {
            let tx = tx.clone();
            let pool = self.pool.clone();
            let handler = handler.clone();
            let counters = self.counters.clone();

            tasks.spawn(async move {
                let _slot = pool.acquire().await;
                counters.record_attempt();
                tracing::debug!("Scraping {}", url);

                let outcome = handler.handle(url.clone()).await;
                if tx.send(WorkerReport { url, outcome }).is_err() {
                    tracing::error!("Collector closed before all reports were sent");
                }
            });
        }
        drop(tx);

        let mut seen_rows = Deduplicator::new();
        let mut done = 0u64;

        while let Some(report) = rx.recv().await {
            done += 1;

            match report.outcome {
                Ok(rows) => {
                    self.counters.record_success();

                    let rows: Vec<H::Row> = rows
                        .into_iter()
                        .filter(|row| match row.dedupe_key() {
                            Some(key) => seen_rows.insert(&key),
                            None => true,
                        })
                        .collect();

                    // Blocking write under the sink lock, at most one batch long
                    if !rows.is_empty() {
                        if let Err(e) = sink.append(rows) {
                            tracing::warn!("Rows from {} were not persisted: {}", report.url, e);
                        }
                    }
                }
                Err(failure) => {
                    self.counters.record_failure();
                    tracing::warn!("Failed to scrape {}: {}", report.url, failure);
                }
            }

            tracing::info!("Scraped {} of {} URLs", done, total);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                self.counters.record_failure();
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        if let Err(e) = sink.flush() {
            tracing::error!("Final flush of {} failed: {}", sink.path().display(), e);
        }

        let snapshot = self.counters.snapshot();
        let summary = RunSummary {
            stage,
            total_urls: total,
            attempted: snapshot.attempted,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            rows_written: sink.rows_written(),
            failed_batches: sink.failed_batches(),
            started_at,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            "Finished {} stage: {} succeeded, {} failed, {} rows written",
            stage,
            summary.succeeded,
            summary.failed,
            summary.rows_written
        );

        Ok(summary)
    }
}
