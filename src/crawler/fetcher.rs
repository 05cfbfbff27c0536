//! Page fetching
//!
//! This module handles all page retrieval for the pipeline, including:
//! - The `PageSource` capability, one attempt at fetching one URL
//! - An HTTP implementation built on `reqwest`
//! - `PageFetcher`, which adds the retry policy and the shared rate limit
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::scheduler::RateLimiter;
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a single fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("transport error: {message}")]
    Transport { message: String },
}

/// A page retrieved by a `PageSource`
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Page body
    pub body: String,

    /// URL the content was served from, after redirects
    pub final_url: String,
}

/// Result of a fetch after the retry policy has run
#[derive(Debug)]
pub enum FetchResult {
    /// The page was retrieved
    Success {
        /// Page body
        body: String,
        /// Final URL after redirects
        final_url: String,
        /// Attempts used, including the successful one
        attempts: u32,
    },

    /// Every attempt failed
    Failure {
        /// The failure of the last attempt
        failure: FetchFailure,
        /// Attempts used
        attempts: u32,
        /// True once the retry budget is spent; the URL counts as unreachable
        retries_exhausted: bool,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Capability to fetch one URL once
///
/// Implemented over plain HTTP by [`HttpPageSource`]. A browser-automation
/// backend fits the same shape: navigate, then return the page source and the
/// current URL. The coordinator and extractor only ever see this trait.
pub trait PageSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, FetchFailure>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::FetcherConfig;
/// use listing_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageSource` over HTTP(S)
///
/// Each instance owns its own client, so two sources never share connections
/// or cookies. Detail extraction uses a second instance as the isolated
/// context for outbound websites.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::HttpStatus {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(classify_error)?;

        Ok(FetchedPage { body, final_url })
    }
}

/// Maps a reqwest error onto the failure taxonomy
fn classify_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if let Some(status) = e.status() {
        FetchFailure::HttpStatus {
            status: status.as_u16(),
        }
    } else if e.is_connect() {
        FetchFailure::Transport {
            message: "connection refused".to_string(),
        }
    } else {
        FetchFailure::Transport {
            message: e.to_string(),
        }
    }
}

/// A `PageSource` wrapped in the retry policy and a rate budget
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Timeout | Retry after `retry_delay` |
/// | Non-2xx status | Retry after `retry_delay` |
/// | Transport error | Retry after `retry_delay` |
/// | Attempts == `max_attempts` | `Failure { retries_exhausted: true }` |
///
/// Every attempt, first or retry, waits for a slot from the rate limiter, so
/// all workers sharing this fetcher share one request budget.
pub struct PageFetcher<S: PageSource> {
    source: S,
    limiter: RateLimiter,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<S: PageSource> PageFetcher<S> {
    pub fn new(source: S, request_delay: Duration, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            source,
            limiter: RateLimiter::new(request_delay),
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(source: S, config: &FetcherConfig) -> Self {
        Self::new(
            source,
            Duration::from_millis(config.request_delay_ms),
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches a URL, retrying until it succeeds or the budget is spent
    ///
    /// Never fails past this boundary: every problem ends up in
    /// `FetchResult::Failure`.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut attempt = 0;

        loop {
            attempt += 1;

            self.limiter.until_ready().await;
            let outcome = self.source.fetch(url).await;
            self.limiter.complete().await;

            match outcome {
                Ok(page) => {
                    if attempt > 1 {
                        tracing::debug!("Fetched {} on attempt {}", url, attempt);
                    }
                    return FetchResult::Success {
                        body: page.body,
                        final_url: page.final_url,
                        attempts: attempt,
                    };
                }
                Err(failure) => {
                    tracing::warn!(
                        "Failed to fetch {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.max_attempts,
                        failure
                    );

                    if attempt >= self.max_attempts {
                        return FetchResult::Failure {
                            failure,
                            attempts: attempt,
                            retries_exhausted: true,
                        };
                    }

                    tracing::debug!("Retrying {} in {:?}", url, self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
