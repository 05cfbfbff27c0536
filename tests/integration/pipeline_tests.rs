//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for the directory site and the
//! businesses' own websites, and run both stages end-to-end.

use listing_harvest::config::{assemble_locations, Config, LocationsConfig};
use listing_harvest::crawler::{
    discover_links, extract_details, FetchFailure, HttpPageSource, PageSource,
};
use listing_harvest::output::{read_link_file, Stage};
use listing_harvest::url::generate_search_urls;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Builds a listing page whose detail links depend only on the location
struct ListingByLocation;

impl Respond for ListingByLocation {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let location = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "geo_location_terms")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let slug: String = location
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();

        ResponseTemplate::new(200)
            .set_body_string(format!(
                r#"<html><body>
                <a class="business-name" href="/mip/{slug}-1">First</a>
                <a class="business-name" href="/mip/{slug}-2">Second</a>
                <a class="business-name" href="/categories">Not a listing</a>
                </body></html>"#,
                slug = slug
            ))
            .insert_header("content-type", "text/html")
    }
}

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.search.base_url = format!("{}/search", server.uri());
    config.fetcher.timeout_secs = 5;
    config.fetcher.request_delay_ms = 0;
    config.fetcher.retry_delay_ms = 0;
    config.crawler.concurrency = 4;
    config.output.links_path = dir.path().join("links.csv").display().to_string();
    config.output.details_path = dir.path().join("details.csv").display().to_string();
    config.output.batch_size = 2;
    config
}

fn detail_page(name: &str, extra: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><body>
            <h1 class="dockable business-name">{}</h1>
            <a class="phone dockable">(301) 555-0100</a>
            {}
            </body></html>"#,
            name, extra
        ))
        .insert_header("content-type", "text/html")
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open output");
    reader
        .records()
        .map(|r| r.expect("Malformed row"))
        .collect()
}

#[tokio::test]
async fn test_links_stage_writes_deduplicated_links() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // 2 terms x 3 locations = 6 listing requests
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ListingByLocation)
        .expect(6)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server, &dir);
    let locations = assemble_locations(&LocationsConfig {
        seeds: config.locations.seeds.clone(),
        select: vec![1, 2, 3],
        custom: String::new(),
    })
    .unwrap();
    let candidates = generate_search_urls(
        &config.search.base_url,
        &["Coffee Shop", "Bakery"],
        &locations,
        1,
        None,
    )
    .unwrap();
    assert_eq!(candidates.len(), 6);

    let urls = candidates.into_iter().map(|c| c.url).collect();
    let summary = discover_links(&config, urls).await.unwrap();

    assert_eq!(summary.stage, Stage::Links);
    assert_eq!(summary.attempted, 6);
    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 0);

    // Each location yields 2 links, shared by both terms
    let links = read_link_file(Path::new(&config.output.links_path)).unwrap();
    assert_eq!(links.len(), 6);
    assert_eq!(links.iter().collect::<HashSet<_>>().len(), 6);
    for link in &links {
        assert!(link.starts_with(&mock_server.uri()));
        assert!(link.contains("/mip/"));
    }
    assert_eq!(summary.rows_written, 6);
}

#[tokio::test]
async fn test_details_stage_counts_unreachable_page() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for n in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/mip/shop-{}", n)))
            .respond_with(detail_page(&format!("Shop {}", n), ""))
            .mount(&mock_server)
            .await;
    }

    // Every attempt fails: the fetcher must give up after exactly 3
    Mock::given(method("GET"))
        .and(path("/mip/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server, &dir);
    config.crawler.follow_website = false;

    let urls = vec![
        format!("{}/mip/shop-1", mock_server.uri()),
        format!("{}/mip/broken", mock_server.uri()),
        format!("{}/mip/shop-2", mock_server.uri()),
        format!("{}/mip/shop-3", mock_server.uri()),
    ];
    let summary = extract_details(&config, urls).await.unwrap();

    assert_eq!(summary.stage, Stage::Details);
    assert_eq!(summary.total_urls, 4);
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.rows_written, 3);

    let rows = read_rows(Path::new(&config.output.details_path));
    assert_eq!(rows.len(), 3);
    let mut names: Vec<_> = rows.iter().map(|r| r[1].to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["Shop 1", "Shop 2", "Shop 3"]);
    for row in &rows {
        assert_eq!(&row[0], "(301) 555-0100");
        assert_eq!(&row[3], "127.0.0.1");
    }
}

#[tokio::test]
async fn test_details_stage_mines_business_website() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/mip/joes"))
        .respond_with(detail_page(
            "Joe's Cafe",
            r#"<a class="website-link dockable" href="/site/joes">Visit Website</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/site/joes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<footer>Write to hello@joescafe.example
            <img src="/img/logo@2x.png">
            <a href="https://www.instagram.com/joescafe/">Instagram</a></footer>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server, &dir);
    let urls = vec![format!("{}/mip/joes", mock_server.uri())];
    let summary = extract_details(&config, urls).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows_written, 2);

    let rows = read_rows(Path::new(&config.output.details_path));
    assert_eq!(rows.len(), 2);

    assert_eq!(&rows[0][1], "Joe's Cafe");
    assert_eq!(&rows[0][2], "");

    assert_eq!(&rows[1][0], "");
    assert_eq!(&rows[1][1], "");
    assert_eq!(&rows[1][2], "hello@joescafe.example");
    assert_eq!(&rows[1][4], "https://www.instagram.com/joescafe/");
}

#[tokio::test]
async fn test_http_source_maps_status_codes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&mock_server)
        .await;

    let source = HttpPageSource::new(&Config::default().fetcher).unwrap();

    let missing = source
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;
    assert_eq!(missing.unwrap_err(), FetchFailure::HttpStatus { status: 404 });

    let page = source
        .fetch(&format!("{}/old", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(page.body, "moved here");
    assert_eq!(page.final_url, format!("{}/new", mock_server.uri()));
}
