//! Records and requests
//!
//! A `Record` is the unit that flows from the page pipeline into the dataset
//! and from there into the search index. A `Request` is the unit the request
//! queue hands to the page pipeline.

mod request;

pub use request::{Request, RequestDebugInfo};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical page URL; primary key for reconciliation
pub const FIELD_URL: &str = "url";

/// Crawler identity that produced the record
pub const FIELD_CRAWLED_BY: &str = "crawledBy";

/// RFC 3339 timestamp of the crawl
pub const FIELD_CRAWLED_AT: &str = "crawledAt";

/// Request debug descriptor
pub const FIELD_DEBUG: &str = "#debug";

/// Identity assigned by the search index
pub const FIELD_OBJECT_ID: &str = "objectID";

/// A flat JSON object of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record holding only the given URL
    pub fn with_url(url: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.insert(FIELD_URL, Value::String(url.into()));
        record
    }

    /// Creates the record persisted for a page that could not be processed
    ///
    /// It carries the debug descriptor and nothing else, so it can be told
    /// apart from content records by the missing `url`.
    pub fn failure(debug: &RequestDebugInfo) -> Self {
        let mut record = Self::new();
        record.insert(FIELD_DEBUG, debug.to_value());
        record
    }

    /// Returns the URL if present and a non-empty string
    pub fn url(&self) -> Option<&str> {
        self.0
            .get(FIELD_URL)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Returns the index identity if present
    pub fn object_id(&self) -> Option<&str> {
        self.0.get(FIELD_OBJECT_ID).and_then(Value::as_str)
    }

    /// Returns true for failure records (debug descriptor only, no url)
    pub fn is_failure(&self) -> bool {
        self.url().is_none() && self.0.contains_key(FIELD_DEBUG)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Copies every entry of `fields` into the record, overwriting existing ones
    pub fn merge(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Succeeds only for JSON objects, returning the value back otherwise
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
