//! Crawler module for page fetching and processing
//!
//! This module contains the core pipeline logic, including:
//! - HTTP fetching with retry logic
//! - HTML extraction of links and business records
//! - Request pacing and worker-pool limits
//! - Concurrent coordination of a stage
//! - Depth-bounded crawling for the detail stage

mod coordinator;
mod fetcher;
mod orchestrator;
mod parser;
mod scheduler;

pub use coordinator::{Coordinator, LinkDiscovery, UrlHandler};
pub use fetcher::{
    build_http_client, FetchFailure, FetchResult, FetchedPage, HttpPageSource, PageFetcher,
    PageSource,
};
pub use orchestrator::CrawlOrchestrator;
pub use parser::{
    clean_text, extract_emails, extract_instagram_url, host_of, BusinessRecord, DetailLink,
    DetailPage, Extractor, ListingPage,
};
pub use scheduler::{RateLimiter, WorkerPool, WorkerSlot};

use crate::config::Config;
use crate::output::{CsvSink, RunSummary, SinkOptions, Stage};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Runs link discovery over HTTP
///
/// Fetches every listing URL, harvests the detail links and writes them to
/// `config.output.links_path`.
///
/// # Errors
///
/// Fails only if the HTTP client, the selectors or the output file cannot be
/// set up. Per-URL failures are reported in the summary.
pub async fn discover_links(config: &Config, urls: Vec<String>) -> Result<RunSummary, HarvestError> {
    let source = HttpPageSource::new(&config.fetcher)?;
    discover_links_with(config, source, urls).await
}

/// Runs link discovery over any page source
pub async fn discover_links_with<S: PageSource>(
    config: &Config,
    source: S,
    urls: Vec<String>,
) -> Result<RunSummary, HarvestError> {
    let extractor = Arc::new(Extractor::new(&config.selectors)?);
    let fetcher = Arc::new(PageFetcher::from_config(source, &config.fetcher));
    let handler = Arc::new(LinkDiscovery::new(fetcher, extractor));

    let sink: CsvSink<DetailLink> = CsvSink::create(
        Path::new(&config.output.links_path),
        SinkOptions::from(&config.output),
    )?;

    Coordinator::new(config.crawler.concurrency)
        .run(Stage::Links, urls, handler, &sink)
        .await
}

/// Runs detail extraction over HTTP
///
/// The outbound websites are fetched with a second client, so they share
/// neither connections nor the directory site's rate budget.
pub async fn extract_details(
    config: &Config,
    urls: Vec<String>,
) -> Result<RunSummary, HarvestError> {
    let directory = HttpPageSource::new(&config.fetcher)?;
    let outbound = HttpPageSource::new(&config.fetcher)?;
    extract_details_with(config, directory, outbound, urls).await
}

/// Runs detail extraction over any pair of page sources
pub async fn extract_details_with<S: PageSource>(
    config: &Config,
    directory: S,
    outbound: S,
    urls: Vec<String>,
) -> Result<RunSummary, HarvestError> {
    let extractor = Arc::new(Extractor::new(&config.selectors)?);
    let handler = Arc::new(CrawlOrchestrator::new(
        Arc::new(PageFetcher::from_config(directory, &config.fetcher)),
        Arc::new(PageFetcher::from_config(outbound, &config.fetcher)),
        extractor,
        config.crawler.max_depth,
        config.crawler.follow_website,
    ));

    let sink: CsvSink<BusinessRecord> = CsvSink::create(
        Path::new(&config.output.details_path),
        SinkOptions::from(&config.output),
    )?;

    Coordinator::new(config.crawler.concurrency)
        .run(Stage::Details, urls, handler, &sink)
        .await
}
