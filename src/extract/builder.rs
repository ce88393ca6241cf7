use crate::extract::{html_to_text, truncate_chars, RawField};
use crate::record::{Record, RequestDebugInfo, FIELD_CRAWLED_AT, FIELD_CRAWLED_BY, FIELD_DEBUG};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Longest text kept for an extracted field, in characters
pub const MAX_FIELD_LENGTH: usize = 9500;

/// Assembles the record the built-in page function produces for one page
///
/// The record carries the request URL, the plain-text rendering of every
/// extracted field (truncated to `MAX_FIELD_LENGTH` characters) and the
/// request's debug descriptor.
pub fn build_record(url: &str, fields: Vec<RawField>, debug: &RequestDebugInfo) -> Record {
    let mut record = Record::with_url(url);

    for field in fields {
        let text = html_to_text(&field.markup);
        let text = truncate_chars(&text, MAX_FIELD_LENGTH);
        record.insert(field.key, Value::String(text.to_string()));
    }

    record.insert(FIELD_DEBUG, debug.to_value());
    record
}

/// Fields stamped onto every record a page yields
///
/// Applied after the page function ran, so static attributes override page
/// output and the crawl identity overrides both.
#[derive(Debug, Clone)]
pub struct RecordStamp<'a> {
    pub additional_attrs: &'a Map<String, Value>,
    pub crawled_by: &'a str,
    pub crawled_at: DateTime<Utc>,
}

impl<'a> RecordStamp<'a> {
    /// Creates a stamp timestamped now
    pub fn new(additional_attrs: &'a Map<String, Value>, crawled_by: &'a str) -> Self {
        Self {
            additional_attrs,
            crawled_by,
            crawled_at: Utc::now(),
        }
    }

    pub fn apply(&self, record: &mut Record) {
        record.merge(self.additional_attrs);
        record.insert(FIELD_CRAWLED_BY, Value::String(self.crawled_by.to_string()));
        record.insert(
            FIELD_CRAWLED_AT,
            Value::String(self.crawled_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
}
