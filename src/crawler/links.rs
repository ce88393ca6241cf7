//! Link discovery
//!
//! Finds outbound links on a page, keeps the ones matching a pseudo-URL,
//! rewrites them with the configured transform and enqueues every link whose
//! dedup key has not been seen this session.

use crate::crawler::{Page, RequestQueue};
use crate::record::Request;
use crate::url::{resolve_href, LinkTarget, PseudoUrl, UrlTransform};
use crate::SyncError;
use dashmap::DashSet;
use std::sync::Arc;
use url::Url;

/// Dedup keys enqueued so far, shared by every page of a crawl session
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: Arc<DashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key`, returning true only for the first caller
    pub fn insert_new(&self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Counts of one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Resolvable HTTP(S) links on the page
    pub found: usize,

    /// Links matching a pseudo-URL
    pub matched: usize,

    /// Links newly added to the queue
    pub enqueued: usize,
}

/// Discovers and enqueues the links of a page
#[derive(Debug, Clone)]
pub struct LinkDiscoverer {
    selector: String,
    pseudo_urls: Vec<PseudoUrl>,
    transform: UrlTransform,
    seen: SeenSet,
}

impl LinkDiscoverer {
    pub fn new(
        selector: impl Into<String>,
        pseudo_urls: Vec<PseudoUrl>,
        transform: UrlTransform,
        seen: SeenSet,
    ) -> Self {
        Self {
            selector: selector.into(),
            pseudo_urls,
            transform,
            seen,
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Returns true if `url` matches at least one pseudo-URL
    pub fn is_allowed(&self, url: &str) -> bool {
        self.pseudo_urls.iter().any(|purl| purl.matches(url))
    }

    /// Enqueues the links of `page` that match a pseudo-URL and are new
    pub async fn discover(
        &self,
        page: &dyn Page,
        queue: &dyn RequestQueue,
    ) -> Result<DiscoveryReport, SyncError> {
        let base_url = Url::parse(page.url())?;
        let mut report = DiscoveryReport::default();

        let resolved: Vec<Url> = page
            .query_all(&self.selector)?
            .iter()
            .filter_map(|element| element.attr("href"))
            .filter_map(|href| resolve_href(href, &base_url))
            .collect();
        report.found = resolved.len();

        let targets: Vec<LinkTarget> = resolved
            .iter()
            .filter(|url| self.is_allowed(url.as_str()))
            .map(|url| self.transform.apply(url))
            .collect();
        report.matched = targets.len();

        for target in targets {
            if enqueue_target(&self.seen, queue, target).await? {
                report.enqueued += 1;
            }
        }

        tracing::debug!(
            "{}: {} link(s) found, {} matched, {} enqueued",
            page.url(),
            report.found,
            report.matched,
            report.enqueued
        );

        Ok(report)
    }
}

/// Enqueues `target` unless its key was already seen; returns true if it was added
pub async fn enqueue_target(
    seen: &SeenSet,
    queue: &dyn RequestQueue,
    target: LinkTarget,
) -> Result<bool, SyncError> {
    if !seen.insert_new(&target.unique_key) {
        tracing::trace!("Already seen {}", target.unique_key);
        return Ok(false);
    }

    let info = queue.add_request(Request::from_target(target)).await?;
    if info.was_already_present {
        tracing::debug!("Request {} was already queued", info.request_id);
    }
    Ok(!info.was_already_present)
}
