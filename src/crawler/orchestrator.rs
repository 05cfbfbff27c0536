//! Detail-stage crawl of one input URL
//!
//! Starting from a detail link, the orchestrator walks the page's "next"
//! relation with an explicit depth-tagged stack, scrapes every detail page it
//! meets and, when enabled, mines each business's own website through a
//! separate fetcher.

use crate::crawler::coordinator::UrlHandler;
use crate::crawler::fetcher::{FetchFailure, FetchResult, PageFetcher, PageSource};
use crate::crawler::parser::{BusinessRecord, Extractor};
use std::collections::HashSet;
use std::sync::Arc;

/// A page waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
struct WorkItem {
    url: String,
    depth: u32,
}

/// Depth-bounded crawl over the directory site plus outbound websites
pub struct CrawlOrchestrator<S: PageSource> {
    directory: Arc<PageFetcher<S>>,
    outbound: Arc<PageFetcher<S>>,
    extractor: Arc<Extractor>,
    max_depth: u32,
    follow_website: bool,
}

impl<S: PageSource> CrawlOrchestrator<S> {
    /// Creates an orchestrator
    ///
    /// `directory` fetches listing and detail pages. `outbound` fetches the
    /// businesses' own websites and should not share a client or a rate budget
    /// with `directory`.
    pub fn new(
        directory: Arc<PageFetcher<S>>,
        outbound: Arc<PageFetcher<S>>,
        extractor: Arc<Extractor>,
        max_depth: u32,
        follow_website: bool,
    ) -> Self {
        Self {
            directory,
            outbound,
            extractor,
            max_depth: max_depth.max(1),
            follow_website,
        }
    }

    /// Crawls from `start_url`, returning every record found on the way
    ///
    /// # Errors
    ///
    /// Returns the fetch failure of `start_url` itself. Failures of pages
    /// reached later are logged and skipped.
    pub async fn crawl(&self, start_url: &str) -> Result<Vec<BusinessRecord>, FetchFailure> {
        let mut stack = vec![WorkItem {
            url: start_url.to_string(),
            depth: 0,
        }];
        let mut visited = HashSet::new();
        let mut records = Vec::new();

        while let Some(item) = stack.pop() {
            if !visited.insert(item.url.clone()) {
                tracing::debug!("Already visited {}", item.url);
                continue;
            }

            let (body, final_url) = match self.directory.fetch(&item.url).await {
                FetchResult::Success {
                    body, final_url, ..
                } => (body, final_url),
                FetchResult::Failure { failure, .. } if item.depth == 0 => return Err(failure),
                FetchResult::Failure { failure, .. } => {
                    tracing::warn!(
                        "Skipping {} at depth {}: {}",
                        item.url,
                        item.depth,
                        failure
                    );
                    continue;
                }
            };

            let listing = self.extractor.listing_page(&body, &final_url);

            // A detail page is scraped for itself even when it links to other
            // businesses; only listing pages fan out.
            if self.extractor.is_detail_url(&final_url) || listing.detail_links.is_empty() {
                records.extend(self.process_detail(&body, &final_url).await);
            } else {
                for link in listing.detail_links {
                    if !visited.insert(link.clone()) {
                        continue;
                    }
                    match self.directory.fetch(&link).await {
                        FetchResult::Success {
                            body, final_url, ..
                        } => records.extend(self.process_detail(&body, &final_url).await),
                        FetchResult::Failure { failure, .. } => {
                            tracing::warn!("Skipping detail page {}: {}", link, failure);
                        }
                    }
                }
            }

            if let Some(next) = listing.next_page {
                if item.depth + 1 < self.max_depth {
                    stack.push(WorkItem {
                        url: next,
                        depth: item.depth + 1,
                    });
                } else {
                    tracing::debug!("Not following {}: depth limit {}", next, self.max_depth);
                }
            }
        }

        Ok(records)
    }

    /// Records for one detail page: the main row, then the website row if any
    async fn process_detail(&self, body: &str, page_url: &str) -> Vec<BusinessRecord> {
        let detail = self.extractor.detail_page(body, page_url);
        let mut records = vec![detail.record];

        if !self.follow_website {
            return records;
        }
        let Some(website) = detail.website_link else {
            return records;
        };

        match self.outbound.fetch(&website).await {
            FetchResult::Success {
                body, final_url, ..
            } => {
                let record = self.extractor.outbound_record(&body, &final_url);
                if record.has_contact_data() {
                    records.push(record);
                } else {
                    tracing::debug!("No contact data on {}", final_url);
                }
            }
            FetchResult::Failure { failure, .. } => {
                tracing::warn!("Could not load website {}: {}", website, failure);
            }
        }

        records
    }
}

impl<S: PageSource> UrlHandler for CrawlOrchestrator<S> {
    type Row = BusinessRecord;

    async fn handle(&self, url: String) -> Result<Vec<BusinessRecord>, FetchFailure> {
        self.crawl(&url).await
    }
}
