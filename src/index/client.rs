//! Search index capability and its HTTP implementation
//!
//! `HttpSearchIndex` speaks a small JSON protocol:
//! - `POST {base}/1/indexes/{name}/browse` pages through the records matching
//!   a filter, following an opaque cursor
//! - `POST {base}/1/indexes/{name}/batch` applies add/update/delete operations

use crate::record::{Record, FIELD_OBJECT_ID};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of operations sent in one batch call
pub const MAX_BATCH_SIZE: usize = 1000;

/// Errors raised by a search index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode index response: {0}")]
    Decode(String),

    #[error("Record for {url} has no objectID")]
    MissingObjectId { url: String },
}

/// One page of browse results
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BrowsePage {
    pub hits: Vec<Record>,

    /// Cursor of the next page; absent on the last one
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A remote search index
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns one page of the records whose `crawledBy` equals `crawled_by`
    async fn browse(
        &self,
        crawled_by: &str,
        cursor: Option<&str>,
        hits_per_page: u32,
    ) -> Result<BrowsePage, IndexError>;

    /// Saves records; with `auto_generate_id` the index assigns each an `objectID`,
    /// otherwise every record must carry its own
    async fn save_objects(&self, records: &[Record], auto_generate_id: bool) -> Result<(), IndexError>;

    /// Deletes records by `objectID`
    async fn delete_objects(&self, object_ids: &[String]) -> Result<(), IndexError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrowseRequest<'a> {
    filters: String,
    hits_per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: BatchBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum BatchBody<'a> {
    Record(&'a Record),
    ObjectId {
        #[serde(rename = "objectID")]
        object_id: &'a str,
    },
}

/// Search index reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
    index_name: String,
    batch_size: usize,
}

impl HttpSearchIndex {
    pub fn new(client: Client, base_url: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Caps the number of operations per batch call
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/1/indexes/{}/{}", self.base_url, self.index_name, action)
    }

    async fn post<B: Serialize + ?Sized>(&self, action: &str, body: &B) -> Result<String, IndexError> {
        let response = self.client.post(self.endpoint(action)).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(IndexError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(text)
    }

    async fn batch(&self, operations: Vec<BatchOperation<'_>>) -> Result<(), IndexError> {
        let mut operations = operations.into_iter().peekable();
        while operations.peek().is_some() {
            let chunk: Vec<_> = operations.by_ref().take(self.batch_size).collect();
            tracing::debug!("Sending batch of {} operation(s) to {}", chunk.len(), self.index_name);
            self.post("batch", &BatchRequest { requests: chunk }).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn browse(
        &self,
        crawled_by: &str,
        cursor: Option<&str>,
        hits_per_page: u32,
    ) -> Result<BrowsePage, IndexError> {
        let request = BrowseRequest {
            filters: format!("crawledBy:{}", crawled_by),
            hits_per_page,
            cursor,
        };
        let text = self.post("browse", &request).await?;
        serde_json::from_str(&text).map_err(|e| IndexError::Decode(e.to_string()))
    }

    async fn save_objects(&self, records: &[Record], auto_generate_id: bool) -> Result<(), IndexError> {
        let action = if auto_generate_id {
            "addObject"
        } else {
            "updateObject"
        };

        let operations = records
            .iter()
            .map(|record| {
                if !auto_generate_id && record.object_id().is_none() {
                    return Err(IndexError::MissingObjectId {
                        url: record.url().unwrap_or_default().to_string(),
                    });
                }
                Ok(BatchOperation {
                    action,
                    body: BatchBody::Record(record),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.batch(operations).await
    }

    async fn delete_objects(&self, object_ids: &[String]) -> Result<(), IndexError> {
        let operations = object_ids
            .iter()
            .map(|object_id| BatchOperation {
                action: "deleteObject",
                body: BatchBody::ObjectId { object_id },
            })
            .collect();

        self.batch(operations).await
    }
}

/// Returns the `objectID` of a record or a `MissingObjectId` error
pub fn require_object_id(record: &Record) -> Result<String, IndexError> {
    record
        .get(FIELD_OBJECT_ID)
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| IndexError::MissingObjectId {
            url: record.url().unwrap_or_default().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index(server: &MockServer) -> HttpSearchIndex {
        HttpSearchIndex::new(Client::new(), format!("{}/", server.uri()), "docs")
    }

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    async fn request_bodies(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_browse_sends_filter_and_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/docs/browse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [{"objectID": "1", "url": "https://example.com/a"}],
                "cursor": "next-page"
            })))
            .mount(&server)
            .await;

        let page = index(&server)
            .browse("docs-crawler", Some("abc"), 50)
            .await
            .unwrap();

        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.hits[0].object_id(), Some("1"));
        assert_eq!(page.cursor.as_deref(), Some("next-page"));

        let bodies = request_bodies(&server).await;
        assert_eq!(
            bodies[0],
            json!({"filters": "crawledBy:docs-crawler", "hitsPerPage": 50, "cursor": "abc"})
        );
    }

    #[tokio::test]
    async fn test_browse_without_cursor_omits_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/docs/browse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": []})))
            .mount(&server)
            .await;

        let page = index(&server).browse("docs-crawler", None, 1000).await.unwrap();
        assert!(page.hits.is_empty());
        assert!(page.cursor.is_none());

        let bodies = request_bodies(&server).await;
        assert!(bodies[0].get("cursor").is_none());
    }

    #[tokio::test]
    async fn test_api_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = index(&server).browse("docs-crawler", None, 10).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::Api { status: 403, ref message } if message == "invalid key"
        ));
    }

    #[tokio::test]
    async fn test_malformed_browse_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = index(&server).browse("docs-crawler", None, 10).await.unwrap_err();
        assert!(matches!(err, IndexError::Decode(_)));
    }

    #[tokio::test]
    async fn test_save_objects_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/docs/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let records = vec![
            record(json!({"url": "https://example.com/a"})),
            record(json!({"url": "https://example.com/b"})),
            record(json!({"url": "https://example.com/c"})),
        ];
        index(&server)
            .with_batch_size(2)
            .save_objects(&records, true)
            .await
            .unwrap();

        let bodies = request_bodies(&server).await;
        assert_eq!(bodies[0]["requests"].as_array().unwrap().len(), 2);
        assert_eq!(bodies[1]["requests"].as_array().unwrap().len(), 1);
        assert_eq!(
            bodies[0]["requests"][0],
            json!({"action": "addObject", "body": {"url": "https://example.com/a"}})
        );
    }

    #[tokio::test]
    async fn test_update_requires_object_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = index(&server)
            .save_objects(&[record(json!({"url": "https://example.com/a"}))], false)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::MissingObjectId { .. }));
    }

    #[tokio::test]
    async fn test_delete_objects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/docs/batch"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        index(&server)
            .delete_objects(&["1".to_string(), "2".to_string()])
            .await
            .unwrap();

        let bodies = request_bodies(&server).await;
        assert_eq!(
            bodies[0],
            json!({"requests": [
                {"action": "deleteObject", "body": {"objectID": "1"}},
                {"action": "deleteObject", "body": {"objectID": "2"}}
            ]})
        );
    }

    #[test]
    fn test_require_object_id() {
        let record = record(json!({"objectID": "9", "url": "https://example.com/a"}));
        assert_eq!(require_object_id(&record).unwrap(), "9");
        assert!(require_object_id(&Record::with_url("https://example.com/b")).is_err());
    }
}
