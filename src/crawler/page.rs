//! The page pipeline
//!
//! One request goes through rendering, extraction, validation, persistence
//! and link discovery. Every step is checked against the page state machine;
//! any error moves the page to `Failed`.

use crate::config::Config;
use crate::crawler::{
    LinkDiscoverer, PageContext, PageFunction, Renderer, RequestQueue, SeenSet,
};
use crate::extract::{validate_records, RecordStamp, SelectorSpec};
use crate::output::StatsCollector;
use crate::record::{Record, Request};
use crate::state::{PageState, PageTracker};
use crate::storage::{SharedDataset, StorageError};
use crate::url::{PseudoUrl, UrlTransform};
use crate::SyncError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Everything the pipeline needs to know from the configuration
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub crawler_name: String,
    pub seeds: Vec<String>,
    pub selectors: SelectorSpec,
    pub required_attributes: Vec<String>,
    pub additional_attrs: Map<String, Value>,
    pub wait_for_element: Option<String>,
    pub link_selector: String,
    pub pseudo_urls: Vec<PseudoUrl>,
    pub transform: UrlTransform,
    pub cascade: bool,
    pub max_concurrency: usize,
    pub max_request_retries: u32,
}

impl CrawlSettings {
    /// Derives the settings from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let pseudo_urls = config
            .effective_pseudo_urls()
            .iter()
            .map(|pattern| PseudoUrl::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            crawler_name: config.crawler_name.clone(),
            seeds: config.seed_urls().to_vec(),
            selectors: SelectorSpec::from_entries(&config.selectors),
            required_attributes: config.effective_required_attributes(),
            additional_attrs: config.additional_page_attrs.clone(),
            wait_for_element: config.wait_for_element.clone(),
            link_selector: config.link_selector().to_string(),
            pseudo_urls,
            transform: UrlTransform {
                omit_search_params: config.omit_search_params_from_url,
                keep_fragment: config.keep_url_fragment,
            },
            cascade: !config.disable_crawler_cascade,
            max_concurrency: config.crawler.max_concurrency.max(1) as usize,
            max_request_retries: config.crawler.max_request_retries,
        })
    }
}

/// Counts of one successfully processed page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    pub persisted: usize,
    pub dropped: usize,
    pub enqueued: usize,
}

/// Runs the page pipeline for requests handed out by the queue
pub struct PageWorker {
    settings: Arc<CrawlSettings>,
    renderer: Arc<dyn Renderer>,
    queue: Arc<dyn RequestQueue>,
    dataset: SharedDataset,
    page_function: Arc<dyn PageFunction>,
    discoverer: LinkDiscoverer,
    stats: Arc<StatsCollector>,
    run_id: i64,
}

impl PageWorker {
    pub fn new(
        settings: Arc<CrawlSettings>,
        renderer: Arc<dyn Renderer>,
        queue: Arc<dyn RequestQueue>,
        dataset: SharedDataset,
        page_function: Arc<dyn PageFunction>,
        stats: Arc<StatsCollector>,
        run_id: i64,
    ) -> Self {
        let discoverer = LinkDiscoverer::new(
            settings.link_selector.clone(),
            settings.pseudo_urls.clone(),
            settings.transform,
            SeenSet::new(),
        );

        Self {
            settings,
            renderer,
            queue,
            dataset,
            page_function,
            discoverer,
            stats,
            run_id,
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn queue(&self) -> &Arc<dyn RequestQueue> {
        &self.queue
    }

    pub fn seen(&self) -> &SeenSet {
        self.discoverer.seen()
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Processes `request` and settles it with the queue
    ///
    /// Success marks the request handled. A retryable error hands it back to
    /// the queue until `max_request_retries` is used up; after that, or on any
    /// other error, a failure record is persisted and the request is marked
    /// handled.
    pub async fn handle(&self, mut request: Request) {
        tracing::info!("Processing {}", request.url);

        let error = match self.process_page(&request).await {
            Ok(report) => {
                self.stats
                    .record_page_done(report.persisted, report.dropped, report.enqueued);
                self.settle(self.queue.mark_request_handled(&request).await, &request);
                return;
            }
            Err(e) => e,
        };

        request.error_messages.push(error.to_string());

        if error.is_retryable() && request.retry_count < self.settings.max_request_retries {
            request.retry_count += 1;
            tracing::warn!(
                "Retrying {} ({}/{}): {}",
                request.url,
                request.retry_count,
                self.settings.max_request_retries,
                error
            );
            self.stats.record_retry();
            let url = request.url.clone();
            if let Err(e) = self.queue.reclaim_request(request).await {
                tracing::error!("Failed to reclaim {}: {}", url, e);
            }
            return;
        }

        tracing::warn!("Request {} failed: {}", request.url, error);
        let status_code = match &error {
            SyncError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        };
        let failure = Record::failure(&request.debug_info(None, status_code));
        let persisted = match self.persist(std::slice::from_ref(&failure)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to persist failure record for {}: {}", request.url, e);
                false
            }
        };
        self.stats.record_page_failed(persisted);
        self.settle(self.queue.mark_request_handled(&request).await, &request);
    }

    /// Runs the pipeline for one page
    pub async fn process_page(&self, request: &Request) -> Result<PageReport, SyncError> {
        let mut tracker = PageTracker::new(request.url.clone());
        let result = self.run_pipeline(request, &mut tracker).await;
        if result.is_err() {
            tracker.fail();
        }
        result
    }

    async fn run_pipeline(
        &self,
        request: &Request,
        tracker: &mut PageTracker,
    ) -> Result<PageReport, SyncError> {
        tracker.advance(PageState::Rendering)?;
        let page = self.renderer.open(request).await?;
        if let Some(selector) = &self.settings.wait_for_element {
            page.wait_for_selector(selector).await?;
        }

        tracker.advance(PageState::Extracting)?;
        let ctx = PageContext {
            page: page.as_ref(),
            request,
            selectors: &self.settings.selectors,
            required_attributes: &self.settings.required_attributes,
            queue: self.queue.as_ref(),
        };
        let output = self.page_function.process(&ctx).await?;

        tracker.advance(PageState::Validating)?;
        let outcome = validate_records(output.into_records(), &self.settings.required_attributes);

        tracker.advance(PageState::Persisting)?;
        let stamp = RecordStamp::new(&self.settings.additional_attrs, &self.settings.crawler_name);
        let mut records = outcome.records;
        for record in &mut records {
            stamp.apply(record);
        }
        self.persist(&records)?;

        // Records are already stored, so the page no longer fails from here on
        let mut enqueued = 0;
        if self.settings.cascade {
            tracker.advance(PageState::LinkDiscovering)?;
            match self
                .discoverer
                .discover(page.as_ref(), self.queue.as_ref())
                .await
            {
                Ok(discovered) => enqueued = discovered.enqueued,
                Err(e) => tracing::warn!("Link discovery failed on {}: {}", request.url, e),
            }
        }

        tracker.advance(PageState::Done)?;
        tracing::debug!(
            "{}: {} record(s) persisted, {} dropped, {} link(s) enqueued",
            request.url,
            records.len(),
            outcome.dropped,
            enqueued
        );

        Ok(PageReport {
            persisted: records.len(),
            dropped: outcome.dropped,
            enqueued,
        })
    }

    fn persist(&self, records: &[Record]) -> Result<(), SyncError> {
        let mut dataset = self
            .dataset
            .lock()
            .map_err(|_| StorageError::Database("dataset lock poisoned".to_string()))?;
        dataset.push_records(self.run_id, records)?;
        Ok(())
    }

    fn settle(&self, result: Result<(), SyncError>, request: &Request) {
        if let Err(e) = result {
            tracing::error!("Failed to settle {} with the queue: {}", request.url, e);
        }
    }
}
