//! site-sync: crawl a website into records and keep a search index in step
//!
//! This crate crawls a website, extracts structured records from every page
//! through configurable CSS selectors, and reconciles the resulting record set
//! with a search index, applying only the add/update/remove diff needed to make
//! the index match the fresh crawl.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod index;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;
pub mod sync;
pub mod url;

use thiserror::Error;

/// Main error type for site-sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Page {url} is not accessible: {message}")]
    PageAccess { url: String, message: String },

    #[error("Page {url} is not HTML (content type '{content_type}')")]
    UnsupportedContent { url: String, content_type: String },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Page function must return an object or an array of objects, it returned {found}")]
    InvalidPageFunctionResult { found: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request queue error: {0}")]
    Queue(String),

    #[error("Failed to read index snapshot for crawler '{crawled_by}': {source}")]
    SnapshotRetrieval {
        crawled_by: String,
        source: index::IndexError,
    },

    #[error("Index {operation} failed (already applied: {}): {source}", format_applied(.applied))]
    IndexWrite {
        operation: index::WriteOperation,
        applied: Vec<index::WriteOperation>,
        source: index::IndexError,
    },

    #[error("Crawl was aborted with {pending} request(s) unfinished; refusing to reconcile")]
    CrawlAborted { pending: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Returns true if the request queue should retry the page that raised this error
    ///
    /// Rendering and network failures are transient. Bad page-function output,
    /// bad selectors and persistence failures are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::PageAccess { .. } => true,
            Self::Reqwest(_) => true,
            Self::HttpStatus { status, .. } => !matches!(status, 400 | 401 | 403 | 404 | 410),
            _ => false,
        }
    }
}

fn format_applied(applied: &[index::WriteOperation]) -> String {
    if applied.is_empty() {
        return "none".to_string();
    }
    applied
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pseudo-URL pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown page function: {0}")]
    UnknownPageFunction(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for site-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{Record, Request};
pub use state::PageState;
pub use sync::{SyncOptions, SyncReport, Syncer};
