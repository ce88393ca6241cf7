//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates a crawl session:
//! - Enqueueing the seeds
//! - Handing queued requests to page workers, bounded by `max-concurrency`
//! - Draining in-flight pages before returning
//! - Stopping early when aborted

use crate::crawler::links::enqueue_target;
use crate::crawler::PageWorker;
use crate::output::CrawlStatistics;
use crate::record::Request;
use crate::url::LinkTarget;
use crate::SyncError;
use futures::{stream, FutureExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// Number of seeds added to the queue at once
const SEED_FAN_OUT: usize = 3;

/// Stops a running crawl
///
/// Pages already being processed are finished; nothing new is started.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub run_id: i64,
    pub stats: CrawlStatistics,

    /// The crawl was stopped before the queue drained
    pub aborted: bool,

    /// Requests left pending or in progress
    pub pending: usize,
}

impl CrawlOutcome {
    /// True if every queued request was handled
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.pending == 0
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    worker: Arc<PageWorker>,
    run_id: i64,
    abort: AbortHandle,
}

impl Coordinator {
    /// Creates a coordinator for run `run_id`, stopped early through `abort`
    pub fn new(worker: PageWorker, run_id: i64, abort: AbortHandle) -> Self {
        Self {
            worker: Arc::new(worker),
            run_id,
            abort,
        }
    }

    /// Returns a handle that stops this crawl
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Runs the crawl until the queue is drained or the crawl is aborted
    pub async fn run(&self) -> Result<CrawlOutcome, SyncError> {
        let start_time = std::time::Instant::now();
        tracing::info!("Starting crawl run {}", self.run_id);

        self.enqueue_seeds().await?;

        let queue = self.worker.queue().clone();
        let semaphore = Arc::new(Semaphore::new(self.worker.settings().max_concurrency));
        let mut abort = self.abort.subscribe();
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut dispatched = 0u64;

        loop {
            if *abort.borrow() {
                tracing::warn!("Crawl aborted, waiting for {} page(s) in flight", tasks.len());
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = abort.changed() => continue,
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|e| SyncError::Queue(format!("page slots closed: {}", e)))?,
            };

            match queue.fetch_next_request().await? {
                Some(request) => {
                    let worker = self.worker.clone();
                    tasks.spawn(async move {
                        worker.handle(request).await;
                        drop(permit);
                    });

                    dispatched += 1;
                    if dispatched % 10 == 0 {
                        let elapsed = start_time.elapsed();
                        tracing::info!(
                            "Progress: {} pages dispatched, {} in flight, {:.2} pages/sec",
                            dispatched,
                            tasks.len(),
                            dispatched as f64 / elapsed.as_secs_f64()
                        );
                    }

                    while let Some(Some(joined)) = tasks.join_next().now_or_never() {
                        log_join_result(joined);
                    }
                }
                None => {
                    drop(permit);
                    if tasks.is_empty() {
                        tracing::info!("Request queue is empty, crawl complete");
                        break;
                    }
                    // A page in flight may still enqueue links
                    tokio::select! {
                        Some(joined) = tasks.join_next() => log_join_result(joined),
                        _ = abort.changed() => {}
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_result(joined);
        }

        let aborted = *abort.borrow();
        let pending = queue.unfinished_count().await?;
        let stats = self.worker.stats().snapshot();

        tracing::info!(
            "Crawl finished in {:?}: {} page(s) done, {} failed, {} record(s) persisted",
            start_time.elapsed(),
            stats.pages_done,
            stats.pages_failed,
            stats.records_persisted
        );

        Ok(CrawlOutcome {
            run_id: self.run_id,
            stats,
            aborted,
            pending,
        })
    }

    /// Adds every seed to the queue, a few at a time
    async fn enqueue_seeds(&self) -> Result<(), SyncError> {
        let seeds = self.worker.settings().seeds.clone();
        tracing::info!("Enqueueing {} seed(s)", seeds.len());

        let worker = &self.worker;
        stream::iter(seeds.into_iter().map(Ok::<_, SyncError>))
            .try_for_each_concurrent(SEED_FAN_OUT, |seed| async move {
                let request = Request::new(seed);
                let target = LinkTarget {
                    url: request.url,
                    unique_key: request.unique_key,
                };
                if enqueue_target(worker.seen(), worker.queue().as_ref(), target).await? {
                    worker.stats().record_seed();
                }
                Ok(())
            })
            .await
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!("Page task failed: {}", e);
    }
}
