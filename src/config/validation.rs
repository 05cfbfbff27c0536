use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, OutputConfig, SearchConfig, SelectorConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Search terms are not required here: they may still arrive from the command
/// line. Emptiness of the final term and location lists is checked by the URL
/// generator.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_selector_config(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Upper bound on result pages requested per search
pub const MAX_PAGES_PER_QUERY: u32 = 100;

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must not carry a query string, got '{}'",
            config.base_url
        )));
    }

    if config.pages_per_query < 1 || config.pages_per_query > MAX_PAGES_PER_QUERY {
        return Err(ConfigError::Validation(format!(
            "pages-per-query must be between 1 and {}, got {}",
            MAX_PAGES_PER_QUERY, config.pages_per_query
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max-depth must be >= 1, got {}",
            config.max_depth
        )));
    }

    Ok(())
}

fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("business-link", &config.business_link),
        ("detail-marker", &config.detail_marker),
        ("phone", &config.phone),
        ("name", &config.name),
        ("website-link", &config.website_link),
        ("next-page", &config.next_page),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' cannot be empty",
                key
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.links_path.is_empty() {
        return Err(ConfigError::Validation(
            "links-path cannot be empty".to_string(),
        ));
    }

    if config.details_path.is_empty() {
        return Err(ConfigError::Validation(
            "details-path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}
