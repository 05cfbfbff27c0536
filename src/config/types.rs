use serde::Deserialize;

/// Main configuration structure for listing-harvest
///
/// Every section is optional in the TOML file; missing sections and keys fall
/// back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub locations: LocationsConfig,
    pub fetcher: FetcherConfig,
    pub crawler: CrawlerConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// What to search for on the directory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search terms, combined with every location
    pub terms: Vec<String>,

    /// Search endpoint; term and location are appended as query parameters
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of result pages requested per (term, location) pair
    #[serde(rename = "pages-per-query")]
    pub pages_per_query: u32,

    /// Cap on the number of generated URLs (0 means unlimited)
    #[serde(rename = "max-urls")]
    pub max_urls: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            base_url: "https://www.yellowpages.com/search".to_string(),
            pages_per_query: 1,
            max_urls: 0,
        }
    }
}

/// Location list assembly
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationsConfig {
    /// Seed locations offered for selection
    pub seeds: Vec<String>,

    /// 1-based indices into `seeds`; empty selects every seed
    pub select: Vec<usize>,

    /// Comma-separated extra locations appended after the selection
    pub custom: String,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            seeds: super::locations::DEFAULT_SEED_LOCATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            select: Vec::new(),
            custom: String::new(),
        }
    }
}

/// HTTP fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Minimum spacing between request starts sharing one fetcher (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Pause before retrying a failed attempt (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            request_delay_ms: 1000,
            retry_delay_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

/// Worker pool and crawl shape
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of URLs processed at once (0 means unbounded)
    pub concurrency: usize,

    /// Maximum number of listing levels followed through "next" links
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Whether detail extraction follows the "visit website" link
    #[serde(rename = "follow-website")]
    pub follow_website: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_depth: 3,
            follow_website: true,
        }
    }
}

/// CSS selectors and markers describing the directory's markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Anchors on a listing page that point at detail pages
    #[serde(rename = "business-link")]
    pub business_link: String,

    /// Path segment every detail-page URL contains
    #[serde(rename = "detail-marker")]
    pub detail_marker: String,

    pub phone: String,

    pub name: String,

    /// The "visit website" anchor on a detail page
    #[serde(rename = "website-link")]
    pub website_link: String,

    /// The "next page" anchor on a listing page
    #[serde(rename = "next-page")]
    pub next_page: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            business_link: "a.business-name".to_string(),
            detail_marker: "/mip/".to_string(),
            phone: ".phone.dockable".to_string(),
            name: ".dockable.business-name".to_string(),
            website_link: "a.website-link.dockable".to_string(),
            next_page: "a.next".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV file receiving discovered detail links (stage 1)
    #[serde(rename = "links-path")]
    pub links_path: String,

    /// CSV file receiving business records (stage 2)
    #[serde(rename = "details-path")]
    pub details_path: String,

    /// Rows buffered before a write is flushed to disk
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Write a header row into empty output files
    #[serde(rename = "write-header")]
    pub write_header: bool,

    /// Append to existing output files instead of truncating them
    pub append: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            links_path: "scraped_urls.csv".to_string(),
            details_path: "business_info.csv".to_string(),
            batch_size: 100,
            write_header: true,
            append: false,
        }
    }
}
