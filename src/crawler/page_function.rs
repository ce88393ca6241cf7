//! Page functions
//!
//! A page function turns a rendered page into records. The built-in one runs
//! the selector extractor and record builder; others are registered by name
//! and picked with `page-function` in the configuration.

use crate::crawler::{Page, RequestQueue};
use crate::extract::{build_record, extract_fields, SelectorSpec};
use crate::record::{Record, Request};
use crate::{ConfigError, SyncError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the built-in page function
pub const DEFAULT_PAGE_FUNCTION: &str = "default";

/// Everything a page function may look at while processing one page
pub struct PageContext<'a> {
    pub page: &'a dyn Page,
    pub request: &'a Request,
    pub selectors: &'a SelectorSpec,
    pub required_attributes: &'a [String],
    pub queue: &'a dyn RequestQueue,
}

/// What a page function yields
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutput {
    Single(Record),
    Many(Vec<Record>),
}

impl PageOutput {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Single(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

impl From<Record> for PageOutput {
    fn from(record: Record) -> Self {
        Self::Single(record)
    }
}

impl From<Vec<Record>> for PageOutput {
    fn from(records: Vec<Record>) -> Self {
        Self::Many(records)
    }
}

impl TryFrom<Value> for PageOutput {
    type Error = SyncError;

    /// Accepts an object or an array of objects
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::Single(Record::from(map))),
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    Record::try_from(item).map_err(|other| SyncError::InvalidPageFunctionResult {
                        found: format!("an array containing {}", json_type_name(&other)),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            other => Err(SyncError::InvalidPageFunctionResult {
                found: json_type_name(&other).to_string(),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turns a rendered page into records
#[async_trait]
pub trait PageFunction: Send + Sync {
    async fn process(&self, ctx: &PageContext<'_>) -> Result<PageOutput, SyncError>;
}

/// Extracts one record per page from the configured selectors
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPageFunction;

#[async_trait]
impl PageFunction for DefaultPageFunction {
    async fn process(&self, ctx: &PageContext<'_>) -> Result<PageOutput, SyncError> {
        let fields = extract_fields(ctx.page, ctx.selectors)?;
        let debug = ctx
            .request
            .debug_info(Some(ctx.page.url()), ctx.page.status_code());
        Ok(PageOutput::Single(build_record(&ctx.request.url, fields, &debug)))
    }
}

/// Page functions available by name
#[derive(Clone)]
pub struct PageFunctionRegistry {
    functions: HashMap<String, Arc<dyn PageFunction>>,
}

impl Default for PageFunctionRegistry {
    fn default() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register(DEFAULT_PAGE_FUNCTION, Arc::new(DefaultPageFunction));
        registry
    }
}

impl PageFunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn PageFunction>) {
        self.functions.insert(name.into(), function);
    }

    /// Looks up a page function; `None` selects the built-in one
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn PageFunction>, ConfigError> {
        let name = name.unwrap_or(DEFAULT_PAGE_FUNCTION);
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPageFunction(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{HtmlPage, MemoryRequestQueue};
    use crate::record::FIELD_DEBUG;
    use serde_json::json;

    #[test]
    fn test_output_from_object() {
        let output = PageOutput::try_from(json!({"url": "https://example.com/"})).unwrap();
        assert_eq!(output.into_records().len(), 1);
    }

    #[test]
    fn test_output_from_array() {
        let output = PageOutput::try_from(json!([
            {"url": "https://example.com/#a"},
            {"url": "https://example.com/#b"}
        ]))
        .unwrap();
        assert_eq!(output.into_records().len(), 2);
    }

    #[test]
    fn test_output_rejects_scalars() {
        let err = PageOutput::try_from(json!("just text")).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidPageFunctionResult { ref found } if found == "a string"
        ));
        assert!(PageOutput::try_from(Value::Null).is_err());
    }

    #[test]
    fn test_output_rejects_array_of_scalars() {
        let err = PageOutput::try_from(json!([{"url": "https://example.com/"}, 3])).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPageFunctionResult { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_default_page_function() {
        let page = HtmlPage::new(
            "https://example.com/docs",
            Some(200),
            "<html><body><h1>Docs</h1><main><p>Read <b>me</b></p></main></body></html>",
        );
        let request = Request::new("https://example.com/docs");
        let selectors = SelectorSpec::new([("title", "h1"), ("content", "main")]);
        let queue = MemoryRequestQueue::new();
        let ctx = PageContext {
            page: &page,
            request: &request,
            selectors: &selectors,
            required_attributes: &[],
            queue: &queue,
        };

        let records = DefaultPageFunction.process(&ctx).await.unwrap().into_records();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.url(), Some("https://example.com/docs"));
        assert_eq!(record.get("title"), Some(&json!("Docs")));
        assert_eq!(record.get("content"), Some(&json!("Read me")));
        assert_eq!(
            record.get(FIELD_DEBUG).and_then(|d| d.get("statusCode")),
            Some(&json!(200))
        );
    }

    #[test]
    fn test_registry_resolves_default() {
        let registry = PageFunctionRegistry::new();
        assert!(registry.resolve(None).is_ok());
        assert!(registry.resolve(Some("default")).is_ok());
        assert_eq!(registry.names(), vec!["default"]);
    }

    #[test]
    fn test_registry_rejects_unknown_name() {
        let registry = PageFunctionRegistry::new();
        let err = registry.resolve(Some("missing")).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownPageFunction(ref name) if name == "missing"));
    }
}
