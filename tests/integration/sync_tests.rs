//! Sync tests against a mock website and a mock search index

use crate::common::{batch_operations, mount_batch, mount_browse, mount_page, write_config};
use serde_json::json;
use site_sync::index::{IndexError, WriteOperation};
use site_sync::{SyncError, SyncOptions, Syncer};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Site with a home page linking to `/a` and `/b`
async fn start_site() -> MockServer {
    let site = MockServer::start().await;
    mount_page(&site, "/", r#"<h1>Home</h1><a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&site, "/a", "<h1>New A</h1>").await;
    mount_page(&site, "/b", "<h1>B</h1>").await;
    site
}

#[tokio::test]
async fn test_sync_applies_minimal_diff() {
    let site = start_site().await;
    let base_url = site.uri();

    let index = MockServer::start().await;
    mount_browse(
        &index,
        json!([
            {
                "objectID": "1",
                "url": format!("{}/", base_url),
                "title": "Home",
                "crawledBy": "docs",
                "crawledAt": "2024-01-01T00:00:00.000Z"
            },
            {
                "objectID": "2",
                "url": format!("{}/a", base_url),
                "title": "Old A",
                "crawledBy": "docs",
                "crawledAt": "2024-01-01T00:00:00.000Z"
            },
            {
                "objectID": "3",
                "url": format!("{}/gone", base_url),
                "title": "Gone",
                "crawledBy": "docs",
                "crawledAt": "2024-01-01T00:00:00.000Z"
            }
        ]),
    )
    .await;
    mount_batch(&index).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &base_url, &index.uri(), "");

    let report = Syncer::from_config(config, hash, SyncOptions::default())
        .expect("Failed to create syncer")
        .run()
        .await
        .expect("Sync failed");

    let reconcile = report.reconcile.expect("Index was not reconciled");
    assert_eq!(reconcile.snapshot_size, 3);
    assert_eq!(reconcile.crawled, 3);
    assert_eq!(
        (reconcile.to_add, reconcile.to_update, reconcile.to_remove),
        (1, 1, 1)
    );
    assert_eq!(
        reconcile.write.applied,
        vec![WriteOperation::Add, WriteOperation::Update, WriteOperation::Remove]
    );

    let operations = batch_operations(&index).await;
    assert_eq!(operations.len(), 3);

    assert_eq!(operations[0]["action"], json!("addObject"));
    assert_eq!(operations[0]["body"]["url"], json!(format!("{}/b", base_url)));
    assert_eq!(operations[0]["body"]["crawledBy"], json!("docs"));
    assert!(operations[0]["body"].get("objectID").is_none());

    assert_eq!(operations[1]["action"], json!("updateObject"));
    assert_eq!(operations[1]["body"]["objectID"], json!("2"));
    assert_eq!(operations[1]["body"]["title"], json!("New A"));

    assert_eq!(operations[2]["action"], json!("deleteObject"));
    assert_eq!(operations[2]["body"], json!({ "objectID": "3" }));

    let browse = index
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|request| request.url.path().ends_with("/browse"))
        .expect("Index was not browsed");
    let body: serde_json::Value = serde_json::from_slice(&browse.body).unwrap();
    assert_eq!(body["filters"], json!("crawledBy:docs"));
    assert_eq!(body["hitsPerPage"], json!(1000));

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("| Add | 1 | 1 |"));
    assert!(summary.contains("| Remove | 1 | 1 |"));
}

#[tokio::test]
async fn test_unchanged_site_issues_no_batch() {
    let site = start_site().await;
    let base_url = site.uri();

    let hits: Vec<_> = [("/", "Home"), ("/a", "New A"), ("/b", "B")]
        .iter()
        .enumerate()
        .map(|(i, (route, title))| {
            json!({
                "objectID": i.to_string(),
                "url": format!("{}{}", base_url, route),
                "title": title,
                "crawledBy": "docs",
                "crawledAt": "2024-01-01T00:00:00.000Z"
            })
        })
        .collect();

    let index = MockServer::start().await;
    mount_browse(&index, json!(hits)).await;
    mount_batch(&index).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &base_url, &index.uri(), "");

    let report = Syncer::from_config(config, hash, SyncOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    let reconcile = report.reconcile.unwrap();
    assert!(reconcile.write.applied.is_empty());
    assert!(batch_operations(&index).await.is_empty());
}

#[tokio::test]
async fn test_dry_run_does_not_write() {
    let site = start_site().await;
    let index = MockServer::start().await;
    mount_browse(&index, json!([])).await;
    mount_batch(&index).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), &index.uri(), "");
    let options = SyncOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = Syncer::from_config(config, hash, options)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.reconcile.unwrap().to_add, 3);
    assert!(batch_operations(&index).await.is_empty());
}

#[tokio::test]
async fn test_failed_write_stops_remaining_operations() {
    let site = start_site().await;
    let base_url = site.uri();

    let index = MockServer::start().await;
    mount_browse(
        &index,
        json!([{
            "objectID": "9",
            "url": format!("{}/gone", base_url),
            "title": "Gone",
            "crawledBy": "docs"
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/docs/batch"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index unavailable"))
        .mount(&index)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &base_url, &index.uri(), "");

    let err = Syncer::from_config(config, hash, SyncOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap_err();

    match err {
        SyncError::IndexWrite {
            operation,
            applied,
            source,
        } => {
            assert_eq!(operation, WriteOperation::Add);
            assert!(applied.is_empty());
            assert!(matches!(source, IndexError::Api { status: 500, .. }));
        }
        other => panic!("Expected IndexWrite, got {:?}", other),
    }

    // Only the add batch was attempted
    assert_eq!(batch_operations(&index).await.len(), 3);
    assert!(!dir.path().join("summary.md").exists());
}

#[tokio::test]
async fn test_snapshot_failure_policy() {
    let site = start_site().await;
    let index = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/docs/browse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&index)
        .await;
    mount_batch(&index).await;

    let dir = tempfile::tempdir().unwrap();
    let (config, hash) = write_config(dir.path(), &site.uri(), &index.uri(), "");
    let err = Syncer::from_config(config, hash, SyncOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::SnapshotRetrieval { .. }));
    assert!(batch_operations(&index).await.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let (mut config, hash) = write_config(dir.path(), &site.uri(), &index.uri(), "");
    config.index.snapshot_errors = site_sync::config::SnapshotErrors::Empty;
    let report = Syncer::from_config(config, hash, SyncOptions::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    let reconcile = report.reconcile.unwrap();
    assert_eq!(reconcile.snapshot_size, 0);
    assert_eq!(reconcile.write.added, 3);
}
