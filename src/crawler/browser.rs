//! Page and renderer capabilities
//!
//! The page pipeline never touches HTML directly: it asks a `Page` for the
//! elements matching a selector. A `Renderer` turns a request into a `Page`.
//! `HtmlPage` is the static-HTML implementation backed by `scraper`; a
//! headless-browser renderer can implement the same traits.

use crate::record::Request;
use crate::SyncError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// A snapshot of one matched element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Inner HTML of the element
    pub inner_html: String,

    /// Attributes of the element
    pub attributes: HashMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A rendered page
#[async_trait]
pub trait Page: Send + Sync {
    /// URL the page was finally loaded from (after redirects)
    fn url(&self) -> &str;

    /// HTTP status of the response, when known
    fn status_code(&self) -> Option<u16>;

    /// Waits until an element matching `selector` is present
    async fn wait_for_selector(&self, selector: &str) -> Result<(), SyncError>;

    /// Returns every element matching `selector`, in document order
    fn query_all(&self, selector: &str) -> Result<Vec<Element>, SyncError>;
}

/// Opens pages for requests
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn open(&self, request: &Request) -> Result<Box<dyn Page>, SyncError>;
}

/// A page backed by a fetched HTML document
///
/// The document is re-parsed for each query; `scraper::Html` is not `Send`
/// and must not live across an await point.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    url: String,
    status_code: Option<u16>,
    body: String,
}

impl HtmlPage {
    pub fn new(url: impl Into<String>, status_code: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_code,
            body: body.into(),
        }
    }
}

#[async_trait]
impl Page for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), SyncError> {
        // A static document never changes, so the element is there or it never will be
        if self.query_all(selector)?.is_empty() {
            return Err(SyncError::PageAccess {
                url: self.url.clone(),
                message: format!("element '{}' did not appear", selector),
            });
        }
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element>, SyncError> {
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&self.body);

        let elements = document
            .select(&parsed)
            .map(|element| Element {
                inner_html: element.inner_html(),
                attributes: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            })
            .collect();

        Ok(elements)
    }
}

/// Parses a CSS selector, mapping failures to `InvalidSelector`
pub fn parse_selector(selector: &str) -> Result<Selector, SyncError> {
    Selector::parse(selector).map_err(|e| SyncError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
