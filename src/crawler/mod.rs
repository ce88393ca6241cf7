//! Crawler module for page rendering and record extraction
//!
//! This module contains the core crawling logic, including:
//! - Page rendering over HTTP behind the `Renderer` seam
//! - The request queue and its dedup keys
//! - Page functions turning a rendered page into records
//! - Link discovery filtered by pseudo-URLs
//! - Overall crawl coordination

mod browser;
mod coordinator;
mod fetcher;
mod links;
mod page;
mod page_function;
mod queue;

pub use browser::{parse_selector, Element, HtmlPage, Page, Renderer};
pub use coordinator::{AbortHandle, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, fetch_url, FetchResult, HttpRenderer};
pub use links::{enqueue_target, DiscoveryReport, LinkDiscoverer, SeenSet};
pub use page::{CrawlSettings, PageReport, PageWorker};
pub use page_function::{
    DefaultPageFunction, PageContext, PageFunction, PageFunctionRegistry, PageOutput,
    DEFAULT_PAGE_FUNCTION,
};
pub use queue::{MemoryRequestQueue, QueueOperationInfo, RequestQueue};
