//! listing-harvest: bulk extraction of business listings from a directory site
//!
//! The crate runs a two-stage pipeline. Link discovery expands search terms and
//! locations into listing URLs and harvests detail-page links from them. Detail
//! extraction visits those links, scrapes contact fields and optionally mines the
//! business's own website. Both stages share the same bounded-concurrency,
//! rate-limited fetch loop and the same incremental CSV output.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for listing-harvest operations
///
/// Only configuration problems and catastrophic I/O (an output file that cannot
/// be opened at all) surface as this type. Per-URL failures are counted by the
/// coordinator instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid location selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while persisting rows
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open output {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output writer lock poisoned")]
    Poisoned,
}

/// Result type alias for listing-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BusinessRecord, FetchFailure, FetchResult};
pub use url::{dedupe, generate_search_urls, CandidateUrl};
