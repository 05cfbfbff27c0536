//! HTML extraction for both pipeline stages
//!
//! This module turns fetched pages into data:
//! - Link mode: detail-page links found on a listing page
//! - Detail mode: phone, name, emails and Instagram link of one business
//! - The "next page" and "visit website" relations that drive crawling
//!
//! Extraction never fails. A page that does not carry a signal yields an empty
//! field or an empty list.

use crate::config::SelectorConfig;
use crate::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});

static INSTAGRAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?instagram\.com/[A-Za-z0-9_]+/?").expect("valid instagram regex")
});

/// Substrings marking an "email" as an asset file name (`logo@2x.png`)
const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];

/// A link to a business detail page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailLink {
    pub url: String,
}

impl DetailLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Contact data scraped from one page
///
/// Any field may be empty. A detail page and the business's own website each
/// produce their own record; the two are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessRecord {
    pub phone: String,
    pub name: String,
    pub emails: BTreeSet<String>,
    pub website_host: String,
    pub social_url: String,
}

impl BusinessRecord {
    /// True if the record holds an email or a social link
    pub fn has_contact_data(&self) -> bool {
        !self.emails.is_empty() || !self.social_url.is_empty()
    }

    /// Emails joined the way the output file expects
    pub fn joined_emails(&self) -> String {
        self.emails.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// What a listing-level page offers the crawl
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Absolute detail-page links on the page
    pub detail_links: Vec<String>,

    /// Absolute URL of the next listing page, if any
    pub next_page: Option<String>,
}

/// What a detail page offers the crawl
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    pub record: BusinessRecord,

    /// Absolute URL of the business's own website, if linked
    pub website_link: Option<String>,
}

/// Page extractor built from the configured selectors
#[derive(Debug)]
pub struct Extractor {
    business_link: Selector,
    detail_marker: String,
    phone: Selector,
    name: Selector,
    website_link: Selector,
    next_page: Selector,
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

impl Extractor {
    /// Compiles the selectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSelector` for any selector that is not valid
    /// CSS.
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            business_link: parse_selector(&config.business_link)?,
            detail_marker: config.detail_marker.clone(),
            phone: parse_selector(&config.phone)?,
            name: parse_selector(&config.name)?,
            website_link: parse_selector(&config.website_link)?,
            next_page: parse_selector(&config.next_page)?,
        })
    }

    /// Link mode: detail-page links on a listing page
    ///
    /// Hrefs of the business-link anchors are resolved against `page_url`, and
    /// only those whose path contains the detail marker are kept.
    pub fn detail_links(&self, html: &str, page_url: &str) -> Vec<String> {
        let Some(base) = parse_base(page_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);
        self.collect_detail_links(&document, &base)
    }

    /// Detail mode: the business record on a detail page
    pub fn business_record(&self, html: &str, page_url: &str) -> BusinessRecord {
        let document = Html::parse_document(html);
        self.record_from(&document, html, page_url)
    }

    /// True if the URL's path carries the detail-page marker
    pub fn is_detail_url(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.path().contains(&self.detail_marker))
            .unwrap_or(false)
    }

    /// The "visit website" relation of a detail page
    pub fn website_link(&self, html: &str, page_url: &str) -> Option<String> {
        let base = parse_base(page_url)?;
        let document = Html::parse_document(html);
        first_link(&document, &self.website_link, &base)
    }

    /// The pagination relation of a listing page
    pub fn next_page_link(&self, html: &str, page_url: &str) -> Option<String> {
        let base = parse_base(page_url)?;
        let document = Html::parse_document(html);
        first_link(&document, &self.next_page, &base)
    }

    /// Listing-level view: detail links plus the "next page" relation
    pub fn listing_page(&self, html: &str, page_url: &str) -> ListingPage {
        let Some(base) = parse_base(page_url) else {
            return ListingPage::default();
        };
        let document = Html::parse_document(html);

        ListingPage {
            detail_links: self.collect_detail_links(&document, &base),
            next_page: first_link(&document, &self.next_page, &base),
        }
    }

    /// Detail-level view: the record plus the "visit website" relation
    pub fn detail_page(&self, html: &str, page_url: &str) -> DetailPage {
        let document = Html::parse_document(html);
        let website_link =
            parse_base(page_url).and_then(|base| first_link(&document, &self.website_link, &base));

        DetailPage {
            record: self.record_from(&document, html, page_url),
            website_link,
        }
    }

    /// Record mined from a business's own website
    ///
    /// Only emails and the Instagram link are taken; name and phone stay empty.
    pub fn outbound_record(&self, html: &str, final_url: &str) -> BusinessRecord {
        BusinessRecord {
            phone: String::new(),
            name: String::new(),
            emails: extract_emails(html),
            website_host: host_of(final_url),
            social_url: extract_instagram_url(html),
        }
    }

    fn collect_detail_links(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut links = Vec::new();

        for element in document.select(&self.business_link) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(resolved) = resolve_link(href, base) else {
                continue;
            };
            if resolved.path().contains(&self.detail_marker) {
                links.push(resolved.to_string());
            }
        }

        if links.is_empty() {
            tracing::debug!("No detail links found on {}", base);
        }

        links
    }

    fn record_from(&self, document: &Html, source: &str, page_url: &str) -> BusinessRecord {
        BusinessRecord {
            phone: first_text(document, &self.phone),
            name: first_text(document, &self.name),
            emails: extract_emails(source),
            website_host: host_of(page_url),
            social_url: extract_instagram_url(source),
        }
    }
}

fn parse_base(page_url: &str) -> Option<Url> {
    match Url::parse(page_url) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Cannot resolve links against {}: {}", page_url, e);
            None
        }
    }
}

/// Text of the first element matching `selector`, normalized
fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .unwrap_or_default()
}

/// Resolved href of the first element matching `selector`
fn first_link(document: &Html, selector: &Selector, base: &Url) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base))
        .map(|url| url.to_string())
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only links
/// - Invalid URLs
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}

/// Trims text and collapses internal whitespace runs to one space
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All email-shaped substrings that are not image file names
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| {
            let lower = candidate.to_ascii_lowercase();
            !IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        })
        .map(clean_text)
        .collect()
}

/// The first Instagram profile URL in the text, or an empty string
pub fn extract_instagram_url(text: &str) -> String {
    INSTAGRAM_RE
        .find(text)
        .map(|m| clean_text(m.as_str()))
        .unwrap_or_default()
}

/// Host part of a URL, or an empty string
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_URL: &str = "https://www.yellowpages.com/search?search_terms=cafe";

    fn extractor() -> Extractor {
        Extractor::new(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = SelectorConfig::default();
        config.phone = "div[[".to_string();
        assert!(matches!(
            Extractor::new(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_link_mode_keeps_only_detail_links() {
        let html = r#"
            <html><body>
                <a class="business-name" href="/mip/joes-cafe-1">Joe's</a>
                <a class="business-name" href="https://www.yellowpages.com/mip/annas-2">Anna's</a>
                <a class="business-name" href="../mip/bobs-3?lid=9">Bob's</a>
                <a class="business-name" href="/search?page=2">More</a>
                <a class="business-name" href="https://www.yellowpages.com/categories">Categories</a>
            </body></html>
        "#;

        let links = extractor().detail_links(html, LISTING_URL);
        assert_eq!(
            links,
            vec![
                "https://www.yellowpages.com/mip/joes-cafe-1",
                "https://www.yellowpages.com/mip/annas-2",
                "https://www.yellowpages.com/mip/bobs-3?lid=9",
            ]
        );
    }

    #[test]
    fn test_link_mode_ignores_other_anchors() {
        let html = r#"
            <a href="/mip/not-a-business-name-anchor">Nav</a>
            <a class="business-name">No href</a>
            <a class="business-name" href="javascript:void(0)">JS</a>
            <a class="business-name" href="mailto:a@b.com">Mail</a>
        "#;
        assert!(extractor().detail_links(html, LISTING_URL).is_empty());
    }

    #[test]
    fn test_link_mode_malformed_html() {
        let html = "<html><body><a class=\"business-name\" href=\"/mip/x\"><div></span>";
        let links = extractor().detail_links(html, LISTING_URL);
        assert_eq!(links, vec!["https://www.yellowpages.com/mip/x"]);

        assert!(extractor().detail_links("<<<>>>", LISTING_URL).is_empty());
        assert!(extractor().detail_links(html, "not a url").is_empty());
    }

    #[test]
    fn test_detail_mode_fields() {
        let html = r#"
            <html><body>
                <h1 class="dockable business-name">  Joe's
                    Cafe </h1>
                <a class="phone dockable" href="tel:555">(301)   555-0100</a>
                <p>Reach us at contact@biz.com or see logo@2x.png</p>
                <a href="https://www.instagram.com/joes_cafe/">IG</a>
                <a href="https://instagram.com/other">IG2</a>
            </body></html>
        "#;

        let record =
            extractor().business_record(html, "https://www.yellowpages.com/mip/joes-cafe-1");
        assert_eq!(record.name, "Joe's Cafe");
        assert_eq!(record.phone, "(301) 555-0100");
        assert_eq!(
            record.emails.iter().collect::<Vec<_>>(),
            vec!["contact@biz.com"]
        );
        assert_eq!(record.website_host, "www.yellowpages.com");
        assert_eq!(record.social_url, "https://www.instagram.com/joes_cafe/");
    }

    #[test]
    fn test_detail_mode_missing_fields_are_empty() {
        let record = extractor().business_record("<html><body></body></html>", "https://x.com/");
        assert_eq!(record.phone, "");
        assert_eq!(record.name, "");
        assert!(record.emails.is_empty());
        assert_eq!(record.social_url, "");
        assert!(!record.has_contact_data());
    }

    #[test]
    fn test_image_extensions_filtered_case_insensitive() {
        let emails = extract_emails("a@b.com banner@2x.JPG icon@3x.jpeg x@y.gif sales@shop.org");
        assert_eq!(
            emails.into_iter().collect::<Vec<_>>(),
            vec!["a@b.com", "sales@shop.org"]
        );
    }

    #[test]
    fn test_emails_deduplicated() {
        let emails = extract_emails("info@biz.com info@biz.com INFO@biz.com");
        assert_eq!(emails.len(), 2);
    }

    #[test]
    fn test_instagram_url() {
        assert_eq!(
            extract_instagram_url("see http://instagram.com/shop_1 and more"),
            "http://instagram.com/shop_1"
        );
        assert_eq!(extract_instagram_url("https://facebook.com/shop"), "");
    }

    #[test]
    fn test_listing_page_next_link() {
        let html = r#"
            <a class="business-name" href="/mip/a-1">A</a>
            <a class="next ajax-page" href="/search?search_terms=cafe&amp;page=2">Next</a>
        "#;
        let listing = extractor().listing_page(html, LISTING_URL);
        assert_eq!(listing.detail_links.len(), 1);
        assert_eq!(
            listing.next_page.as_deref(),
            Some("https://www.yellowpages.com/search?search_terms=cafe&page=2")
        );
        assert_eq!(extractor().next_page_link(html, LISTING_URL), listing.next_page);
        assert!(extractor().next_page_link("<p></p>", LISTING_URL).is_none());
    }

    #[test]
    fn test_detail_page_website_link() {
        let html = r#"
            <h1 class="dockable business-name">Joe's</h1>
            <a class="website-link dockable" href="https://joescafe.example/">Visit Website</a>
        "#;
        let detail = extractor().detail_page(html, "https://www.yellowpages.com/mip/joes-1");
        assert_eq!(detail.record.name, "Joe's");
        assert_eq!(
            detail.website_link.as_deref(),
            Some("https://joescafe.example/")
        );

        let without = extractor().detail_page("<p>nothing</p>", "https://www.yellowpages.com/mip/x");
        assert!(without.website_link.is_none());
        assert_eq!(
            extractor().website_link(html, "https://www.yellowpages.com/mip/joes-1"),
            detail.website_link
        );
    }

    #[test]
    fn test_outbound_record() {
        let html = r#"<footer>hello@joescafe.example https://instagram.com/joescafe</footer>"#;
        let record = extractor().outbound_record(html, "https://joescafe.example/home");
        assert_eq!(record.name, "");
        assert_eq!(record.phone, "");
        assert_eq!(record.website_host, "joescafe.example");
        assert_eq!(record.joined_emails(), "hello@joescafe.example");
        assert_eq!(record.social_url, "https://instagram.com/joescafe");
    }

    #[test]
    fn test_is_detail_url() {
        let extractor = extractor();
        assert!(extractor.is_detail_url("https://www.yellowpages.com/mip/joes-cafe-1?lid=2"));
        assert!(!extractor.is_detail_url(LISTING_URL));
        assert!(!extractor.is_detail_url("https://www.yellowpages.com/search?q=/mip/"));
        assert!(!extractor.is_detail_url("not a url"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\t b   c "), "a b c");
        assert_eq!(clean_text("   "), "");
    }
}
