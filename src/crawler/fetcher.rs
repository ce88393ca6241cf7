//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the page renderer, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests to fetch page content
//! - Error classification into retryable and permanent failures

use crate::config::CrawlerConfig;
use crate::crawler::browser::{HtmlPage, Page, Renderer};
use crate::record::Request;
use crate::SyncError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request timed out
        timed_out: bool,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use site_sync::config::CrawlerConfig;
/// use site_sync::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// Redirects are followed by the client; `final_url` is where they ended.
/// Anything that is not `text/html` or `application/xhtml+xml` is reported
/// as `ContentMismatch`.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::NetworkError {
                timed_out: e.is_timeout(),
                error: e.to_string(),
            }
        }
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("text/html") && !content_type.contains("application/xhtml+xml") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => FetchResult::NetworkError {
            timed_out: e.is_timeout(),
            error: e.to_string(),
        },
    }
}

/// Renderer that fetches pages over HTTP and serves them as static HTML
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(&self, request: &Request) -> Result<Box<dyn Page>, SyncError> {
        match fetch_url(&self.client, &request.url).await {
            FetchResult::Success {
                final_url,
                status_code,
                content_type,
                body,
            } => {
                tracing::debug!(
                    "Fetched {} ({}, {}, {} bytes)",
                    final_url,
                    status_code,
                    content_type,
                    body.len()
                );
                Ok(Box::new(HtmlPage::new(final_url, Some(status_code), body)))
            }
            FetchResult::ContentMismatch { content_type } => Err(SyncError::UnsupportedContent {
                url: request.url.clone(),
                content_type,
            }),
            FetchResult::HttpError { status_code } => Err(SyncError::HttpStatus {
                url: request.url.clone(),
                status: status_code,
            }),
            FetchResult::NetworkError { timed_out: true, .. } => Err(SyncError::Timeout {
                url: request.url.clone(),
            }),
            FetchResult::NetworkError { error, .. } => Err(SyncError::PageAccess {
                url: request.url.clone(),
                message: error,
            }),
        }
    }
}
