use crate::url::{normalize_url, LinkTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A URL waiting in, or handed out by, the request queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Identifier assigned by the queue when the request is added
    pub id: Option<String>,

    /// URL to fetch
    pub url: String,

    /// Dedup key; two requests with the same key are the same request
    pub unique_key: String,

    /// HTTP method used for the fetch
    pub method: String,

    /// Number of times the request was handed back to the queue
    pub retry_count: u32,

    /// Messages of every error the request failed with so far
    pub error_messages: Vec<String>,
}

impl Request {
    /// Creates a GET request whose unique key is the normalized URL
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let unique_key = normalize_url(&url, false)
            .map(|normalized| normalized.to_string())
            .unwrap_or_else(|_| url.clone());

        Self {
            id: None,
            url,
            unique_key,
            method: "GET".to_string(),
            retry_count: 0,
            error_messages: Vec::new(),
        }
    }

    /// Creates a request for a discovered link
    pub fn from_target(target: LinkTarget) -> Self {
        Self {
            unique_key: target.unique_key,
            ..Self::new(target.url)
        }
    }

    /// Builds the debug descriptor stored with records produced from this request
    pub fn debug_info(&self, loaded_url: Option<&str>, status_code: Option<u16>) -> RequestDebugInfo {
        RequestDebugInfo {
            request_id: self.id.clone(),
            url: self.url.clone(),
            loaded_url: loaded_url.map(str::to_string),
            method: self.method.clone(),
            retry_count: self.retry_count,
            error_messages: self.error_messages.clone(),
            status_code,
        }
    }
}

/// The `#debug` descriptor of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDebugInfo {
    pub request_id: Option<String>,
    pub url: String,
    pub loaded_url: Option<String>,
    pub method: String,
    pub retry_count: u32,
    pub error_messages: Vec<String>,
    pub status_code: Option<u16>,
}

impl RequestDebugInfo {
    /// Converts the descriptor into a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
