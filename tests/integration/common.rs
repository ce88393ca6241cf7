use serde_json::Value;
use site_sync::config::{load_config_with_hash, Config};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves `body` as an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body>{}</body></html>", body))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Answers every browse call with `hits` and no cursor
pub async fn mount_browse(server: &MockServer, hits: Value) {
    Mock::given(method("POST"))
        .and(path("/1/indexes/docs/browse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "hits": hits })))
        .mount(server)
        .await;
}

/// Accepts every batch call
pub async fn mount_batch(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/1/indexes/docs/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

/// Writes a configuration crawling `site_uri` into `index_uri` and loads it
///
/// `extra` is inserted as top-level keys before any table.
pub fn write_config(dir: &Path, site_uri: &str, index_uri: &str, extra: &str) -> (Config, String) {
    let content = format!(
        r#"
crawler-name = "docs"
start-urls = ["{site}/"]
{extra}

[[selectors]]
key = "title"
value = "h1"

[crawler]
max-concurrency = 4
max-request-retries = 1
request-timeout-secs = 5

[index]
base-url = "{index}"
index-name = "docs"

[output]
database-path = "{db}"
summary-path = "{summary}"
"#,
        site = site_uri,
        index = index_uri,
        extra = extra,
        db = dir.join("records.db").display(),
        summary = dir.join("summary.md").display(),
    );

    let config_path = dir.join("site-sync.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    load_config_with_hash(&config_path).expect("Failed to load config")
}

/// Returns the operations of every batch call the index received, in order
pub async fn batch_operations(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("Request recording is disabled")
        .iter()
        .filter(|request| request.url.path().ends_with("/batch"))
        .flat_map(|request| {
            let body: Value = serde_json::from_slice(&request.body).expect("Batch body is not JSON");
            body["requests"].as_array().cloned().unwrap_or_default()
        })
        .collect()
}

/// Counts GET requests the site received for `route`
pub async fn hits_for(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording is disabled")
        .iter()
        .filter(|request| request.method == wiremock::http::Method::Get && request.url.path() == route)
        .count()
}
