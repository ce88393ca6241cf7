//! Crawl tests against a mock website
//!
//! Every test runs with `crawl_only` so the index is never contacted.

use crate::common::{hits_for, mount_page, write_config};
use serde_json::json;
use site_sync::storage::{open_dataset, Dataset};
use site_sync::{SyncOptions, Syncer};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawl_only() -> SyncOptions {
    SyncOptions {
        crawl_only: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_crawl_extracts_records() {
    let site = MockServer::start().await;
    let base_url = site.uri();

    mount_page(
        &site,
        "/",
        &format!(
            r#"<h1>Home</h1>
            <a href="/guide">Guide</a>
            <a href="{}/api?utm_source=nav">API</a>
            <a href="https://elsewhere.example.org/">Elsewhere</a>
            <a href="mailto:docs@example.com">Mail</a>"#,
            base_url
        ),
    )
    .await;
    mount_page(&site, "/guide", r#"<h1>Guide</h1><a href="/">Home</a>"#).await;
    mount_page(&site, "/api", r#"<h1>API <em>reference</em></h1>"#).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(
        dir.path(),
        &base_url,
        "http://127.0.0.1:9",
        "[additional-page-attrs]\nsection = \"docs\"",
    );
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .expect("Failed to create syncer")
        .run()
        .await
        .expect("Crawl failed");

    assert!(!report.aborted);
    assert!(report.reconcile.is_none());
    assert_eq!(report.crawl.pages_done, 3);
    assert_eq!(report.crawl.pages_failed, 0);

    let dataset = open_dataset(std::path::Path::new(&db_path)).expect("Failed to open DB");
    let mut records = dataset.load_records(report.run_id).unwrap();
    records.sort_by(|a, b| a.url().cmp(&b.url()));

    let urls: Vec<&str> = records.iter().filter_map(|r| r.url()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/api?utm_source=nav", base_url),
            format!("{}/guide", base_url),
        ]
    );

    let api = &records[1];
    assert_eq!(api.get("title"), Some(&json!("API reference")));
    assert_eq!(api.get("section"), Some(&json!("docs")));
    assert_eq!(api.get("crawledBy"), Some(&json!("docs")));
    assert!(api.get("crawledAt").and_then(|v| v.as_str()).is_some());
    assert_eq!(api.get("#debug").unwrap()["statusCode"], json!(200));

    assert_eq!(hits_for(&site, "/").await, 1);
}

#[tokio::test]
async fn test_missing_page_gets_failure_record() {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/missing">Gone</a>"#).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), "http://127.0.0.1:9", "");
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawl.pages_done, 1);
    assert_eq!(report.crawl.pages_failed, 1);
    assert_eq!(report.crawl.retries, 0);
    assert_eq!(hits_for(&site, "/missing").await, 1);

    let dataset = open_dataset(std::path::Path::new(&db_path)).unwrap();
    let failures = dataset.load_failures(report.run_id).unwrap();
    assert_eq!(failures.len(), 1);

    let failure = &failures[0];
    assert_eq!(failure.len(), 1);
    let debug = failure.get("#debug").unwrap();
    assert_eq!(debug["url"], json!(format!("{}/missing", site.uri())));
    assert_eq!(debug["statusCode"], json!(404));
    assert_eq!(debug["retryCount"], json!(0));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/flaky">Flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&site)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), "http://127.0.0.1:9", "");
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    // max-request-retries = 1: the first attempt plus one retry
    assert_eq!(hits_for(&site, "/flaky").await, 2);
    assert_eq!(report.crawl.retries, 1);
    assert_eq!(report.crawl.pages_failed, 1);
    assert_eq!(report.crawl.failure_records, 1);

    let dataset = open_dataset(std::path::Path::new(&db_path)).unwrap();
    let failures = dataset.load_failures(report.run_id).unwrap();
    let debug = failures[0].get("#debug").unwrap();
    assert_eq!(debug["retryCount"], json!(1));
    assert_eq!(debug["errorMessages"].as_array().unwrap().len(), 2);
    assert_eq!(debug["statusCode"], json!(503));
}

#[tokio::test]
async fn test_non_html_link_fails_without_retry() {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/manual.pdf">Manual</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/manual.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.7".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&site)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), "http://127.0.0.1:9", "");
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(hits_for(&site, "/manual.pdf").await, 1);
    assert_eq!(report.crawl.retries, 0);
    assert_eq!(report.crawl.pages_failed, 1);

    let dataset = open_dataset(std::path::Path::new(&db_path)).unwrap();
    let failures = dataset.load_failures(report.run_id).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].len(), 1);
}

#[tokio::test]
async fn test_page_without_required_attribute_is_dropped() {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/untitled">Untitled</a>"#).await;
    mount_page(&site, "/untitled", "<p>No heading here</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), "http://127.0.0.1:9", "");
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawl.pages_done, 2);
    assert_eq!(report.crawl.records_persisted, 1);
    assert_eq!(report.crawl.records_dropped, 1);

    let dataset = open_dataset(std::path::Path::new(&db_path)).unwrap();
    assert_eq!(dataset.count_records(report.run_id).unwrap(), 1);
    assert_eq!(dataset.count_failures(report.run_id).unwrap(), 0);
}

#[tokio::test]
async fn test_disabled_cascade_visits_seeds_only() {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/guide">Guide</a>"#).await;
    mount_page(&site, "/guide", "<h1>Guide</h1>").await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(
        dir.path(),
        &site.uri(),
        "http://127.0.0.1:9",
        "disable-crawler-cascade = true",
    );

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawl.pages_done, 1);
    assert_eq!(report.crawl.links_enqueued, 0);
    assert_eq!(hits_for(&site, "/guide").await, 0);
}

#[tokio::test]
async fn test_omitted_search_params_collapse_links() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/",
        r#"<h1>Home</h1>
        <a href="/page?tab=1">One</a>
        <a href="/page?tab=2#intro">Two</a>
        <a href="/page">Three</a>"#,
    )
    .await;
    mount_page(&site, "/page", "<h1>Page</h1>").await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(
        dir.path(),
        &site.uri(),
        "http://127.0.0.1:9",
        "omit-search-params-from-url = true",
    );
    let db_path = config.output.database_path.clone();

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(hits_for(&site, "/page").await, 1);
    assert_eq!(report.crawl.pages_done, 2);

    let dataset = open_dataset(std::path::Path::new(&db_path)).unwrap();
    let urls: Vec<String> = dataset
        .load_records(report.run_id)
        .unwrap()
        .iter()
        .filter_map(|r| r.url().map(str::to_string))
        .collect();
    assert!(urls.contains(&format!("{}/page", site.uri())));
}

#[tokio::test]
async fn test_pseudo_urls_restrict_discovery() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/",
        r#"<h1>Home</h1><a href="/docs/intro">Intro</a><a href="/blog/news">News</a>"#,
    )
    .await;
    mount_page(&site, "/docs/intro", "<h1>Intro</h1>").await;
    mount_page(&site, "/blog/news", "<h1>News</h1>").await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(
        dir.path(),
        &site.uri(),
        "http://127.0.0.1:9",
        &format!("pseudo-urls = [\"{}/docs/[.*]\"]", site.uri()),
    );

    let report = Syncer::from_config(config, hash, crawl_only())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawl.pages_done, 2);
    assert_eq!(hits_for(&site, "/docs/intro").await, 1);
    assert_eq!(hits_for(&site, "/blog/news").await, 0);
}
