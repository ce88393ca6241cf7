//! Sync driver
//!
//! A sync is one crawl followed by one reconciliation:
//! 1. Record a new dataset run
//! 2. Crawl every queued request through the page pipeline
//! 3. Close the run as completed or aborted
//! 4. Reconcile the run's records with the search index
//! 5. Write the markdown summary, if configured
//!
//! Reconciliation only starts after the coordinator has drained every page,
//! and is refused for an aborted crawl unless partial crawls are accepted.

use crate::config::Config;
use crate::crawler::{
    build_http_client, AbortHandle, Coordinator, CrawlOutcome, CrawlSettings, HttpRenderer,
    MemoryRequestQueue, PageFunctionRegistry, PageWorker, Renderer, RequestQueue,
};
use crate::index::{reconcile, HttpSearchIndex, ReconcileReport, ReconcileSettings, SearchIndex};
use crate::output::{write_markdown_summary, CrawlStatistics, StatsCollector, SyncSummary};
use crate::storage::{open_dataset, Dataset, RunStatus, SharedDataset, StorageError};
use crate::SyncError;
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Switches of one sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Crawl into the dataset without touching the index
    pub crawl_only: bool,

    /// Reconcile even if the crawl was aborted
    pub accept_partial: bool,

    /// Compute the index diff without writing it
    pub dry_run: bool,
}

impl SyncOptions {
    /// Options as set in the configuration file
    pub fn from_config(config: &Config) -> Self {
        Self {
            accept_partial: config.accept_partial,
            ..Self::default()
        }
    }
}

/// Outcome of one sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: i64,
    pub crawl: CrawlStatistics,
    pub aborted: bool,
    pub pending: usize,

    /// `None` when the index was not reconciled
    pub reconcile: Option<ReconcileReport>,
}

/// Runs syncs for one configuration
///
/// The collaborators default to the HTTP renderer, an in-memory request
/// queue, the SQLite dataset at `database-path` and the HTTP search index;
/// each can be replaced before `run`.
pub struct Syncer {
    config: Config,
    config_hash: String,
    options: SyncOptions,
    renderer: Arc<dyn Renderer>,
    queue: Arc<dyn RequestQueue>,
    dataset: SharedDataset,
    index: Arc<dyn SearchIndex>,
    registry: PageFunctionRegistry,
    abort: AbortHandle,
}

impl Syncer {
    pub fn from_config(
        config: Config,
        config_hash: impl Into<String>,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        let client = build_http_client(&config.crawler)?;
        let renderer = HttpRenderer::new(client.clone());
        let index = HttpSearchIndex::new(
            client,
            config.index.base_url.clone(),
            config.index.index_name.clone(),
        );
        let dataset = open_dataset(Path::new(&config.output.database_path))?;

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            options,
            renderer: Arc::new(renderer),
            queue: Arc::new(MemoryRequestQueue::new()),
            dataset: Arc::new(Mutex::new(dataset)),
            index: Arc::new(index),
            registry: PageFunctionRegistry::default(),
            abort: AbortHandle::new(),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_queue(mut self, queue: Arc<dyn RequestQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_dataset(mut self, dataset: SharedDataset) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = index;
        self
    }

    /// Replaces the page functions `page-function` is looked up in
    pub fn with_registry(mut self, registry: PageFunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Returns a handle that aborts the crawl of `run`
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn dataset(&self) -> &SharedDataset {
        &self.dataset
    }

    /// Crawls the site and reconciles the index with the result
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let settings = CrawlSettings::from_config(&self.config)?;
        let page_function = self
            .registry
            .resolve(self.config.page_function.as_deref())?;

        let run_id = lock(&self.dataset)?.create_run(&self.config_hash, &settings.crawler_name)?;
        tracing::info!(
            "Starting sync run {} for '{}' ({} seed(s))",
            run_id,
            settings.crawler_name,
            settings.seeds.len()
        );

        let worker = PageWorker::new(
            Arc::new(settings),
            self.renderer.clone(),
            self.queue.clone(),
            self.dataset.clone(),
            page_function,
            Arc::new(StatsCollector::new()),
            run_id,
        );
        let coordinator = Coordinator::new(worker, run_id, self.abort.clone());

        let outcome = match coordinator.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", run_id, e);
                self.finish_run(run_id, RunStatus::Failed);
                return Err(e);
            }
        };

        let status = if outcome.aborted {
            RunStatus::Aborted
        } else {
            RunStatus::Completed
        };
        lock(&self.dataset)?.finish_run(run_id, status)?;

        let reconcile = self.reconcile_run(&outcome).await?;

        let report = SyncReport {
            run_id,
            crawl: outcome.stats,
            aborted: outcome.aborted,
            pending: outcome.pending,
            reconcile,
        };

        if let Some(path) = &self.config.output.summary_path {
            let summary = SyncSummary {
                run_id,
                crawler_name: self.config.crawler_name.clone(),
                index_name: self.config.index.index_name.clone(),
                config_hash: self.config_hash.clone(),
                started_at,
                finished_at: Utc::now(),
                crawl: report.crawl,
                aborted: report.aborted,
                pending: report.pending,
                reconcile: report.reconcile.clone(),
                dry_run: self.options.dry_run,
            };
            write_markdown_summary(&summary, Path::new(path))?;
        }

        Ok(report)
    }

    async fn reconcile_run(
        &self,
        outcome: &CrawlOutcome,
    ) -> Result<Option<ReconcileReport>, SyncError> {
        if self.options.crawl_only {
            tracing::info!("Crawl only: index left untouched");
            return Ok(None);
        }

        if outcome.aborted {
            if !self.options.accept_partial {
                return Err(SyncError::CrawlAborted {
                    pending: outcome.pending,
                });
            }
            tracing::warn!(
                "Reconciling a partial crawl ({} request(s) unfinished)",
                outcome.pending
            );
        }

        let records = lock(&self.dataset)?.load_records(outcome.run_id)?;
        let settings = ReconcileSettings {
            crawled_by: self.config.crawler_name.clone(),
            browse_batch_size: self.config.index.browse_batch_size,
            snapshot_errors: self.config.index.snapshot_errors,
            dry_run: self.options.dry_run,
        };

        match reconcile(self.index.as_ref(), &records, &settings).await {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::error!("Reconciliation failed: {}", e);
                Err(e)
            }
        }
    }

    fn finish_run(&self, run_id: i64, status: RunStatus) {
        let result = lock(&self.dataset)
            .and_then(|mut dataset| dataset.finish_run(run_id, status).map_err(SyncError::from));
        if let Err(e) = result {
            tracing::error!("Failed to close run {}: {}", run_id, e);
        }
    }
}

/// Crawls and reconciles with the default collaborators
pub async fn run_sync(
    config: Config,
    config_hash: impl Into<String>,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    Syncer::from_config(config, config_hash, options)?.run().await
}

fn lock(dataset: &SharedDataset) -> Result<MutexGuard<'_, dyn Dataset + Send + 'static>, SyncError> {
    dataset
        .lock()
        .map_err(|_| StorageError::Database("dataset lock poisoned".to_string()).into())
}
