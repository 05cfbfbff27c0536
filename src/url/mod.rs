//! URL-space generation for listing-harvest
//!
//! This module expands search terms × locations × result pages into the
//! candidate listing URLs fetched by link discovery, and provides the set-based
//! deduplication used on both ends of the pipeline.

mod dedupe;
mod encode;

use crate::config::MAX_PAGES_PER_QUERY;
use crate::ConfigError;
use std::collections::HashSet;

// Re-export main functions
pub use dedupe::{dedupe, Deduplicator};
pub use encode::{encode_location, encode_term};

/// A fully formed search URL together with the triple it was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateUrl {
    /// Percent-encoded request URL
    pub url: String,

    /// Normalized search term
    pub term: String,

    /// Normalized location
    pub location: String,

    /// 1-based result page; page 1 carries no `page` parameter
    pub page: u32,
}

/// Normalizes a raw input list into its logical set
///
/// Entries are trimmed and internal whitespace runs collapse to a single
/// space. Blank entries are dropped and repeats keep their first position.
pub fn normalize_inputs<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|s| s.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Number of URLs the product of the given lists would produce
pub fn possible_url_count(terms: usize, locations: usize, pages_per_query: u32) -> usize {
    terms
        .saturating_mul(locations)
        .saturating_mul(pages_per_query as usize)
}

/// Generates one search URL per (term, location, page) combination
///
/// Terms and locations are normalized first, so duplicates in the raw lists do
/// not multiply the product.
///
/// When `max_urls` is set and the full product exceeds it, the location list is
/// truncated (terms never are) to the largest prefix that fits.
///
/// # Errors
///
/// Returns `ConfigError::Validation` if either list is empty after
/// normalization, if `pages_per_query` is zero, or if `max_urls` is too small
/// to keep even one location.
///
/// # Example
///
/// ```
/// use listing_harvest::url::generate_search_urls;
///
/// let urls = generate_search_urls(
///     "https://www.yellowpages.com/search",
///     &["Hair Salon"],
///     &["Bethesda, MD"],
///     2,
///     None,
/// )
/// .unwrap();
/// assert_eq!(urls.len(), 2);
/// assert_eq!(
///     urls[1].url,
///     "https://www.yellowpages.com/search?search_terms=Hair%20Salon&geo_location_terms=Bethesda%2C+MD&page=2"
/// );
/// ```
pub fn generate_search_urls<S: AsRef<str>, L: AsRef<str>>(
    base_url: &str,
    terms: &[S],
    locations: &[L],
    pages_per_query: u32,
    max_urls: Option<usize>,
) -> Result<Vec<CandidateUrl>, ConfigError> {
    let terms = normalize_inputs(terms);
    let mut locations = normalize_inputs(locations);

    if terms.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search term is required".to_string(),
        ));
    }
    if locations.is_empty() {
        return Err(ConfigError::Validation(
            "at least one location is required".to_string(),
        ));
    }
    if pages_per_query < 1 || pages_per_query > MAX_PAGES_PER_QUERY {
        return Err(ConfigError::Validation(format!(
            "pages per query must be between 1 and {}",
            MAX_PAGES_PER_QUERY
        )));
    }

    if let Some(cap) = max_urls {
        let per_location = possible_url_count(terms.len(), 1, pages_per_query);
        if possible_url_count(terms.len(), locations.len(), pages_per_query) > cap {
            let keep = cap / per_location;
            if keep == 0 {
                return Err(ConfigError::Validation(format!(
                    "URL cap {} is below the {} URLs needed for a single location",
                    cap, per_location
                )));
            }
            tracing::info!(
                "Truncating locations from {} to {} to respect the cap of {} URLs",
                locations.len(),
                keep,
                cap
            );
            locations.truncate(keep);
        }
    }

    let mut urls = Vec::with_capacity(possible_url_count(
        terms.len(),
        locations.len(),
        pages_per_query,
    ));

    for term in &terms {
        for location in &locations {
            let base = format!(
                "{}?search_terms={}&geo_location_terms={}",
                base_url,
                encode_term(term),
                encode_location(location)
            );
            for page in 1..=pages_per_query {
                let url = if page == 1 {
                    base.clone()
                } else {
                    format!("{}&page={}", base, page)
                };
                urls.push(CandidateUrl {
                    url,
                    term: term.clone(),
                    location: location.clone(),
                    page,
                });
            }
        }
    }

    Ok(urls)
}
