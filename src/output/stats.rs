//! Crawl statistics
//!
//! Live counters updated by the page workers while a crawl runs, and
//! statistics loaded back from the record dataset afterwards.

use crate::storage::{Dataset, RunRecord};
use crate::SyncError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one crawl session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Seeds added to the queue
    pub seeds_enqueued: u64,

    /// Pages that reached `Done`
    pub pages_done: u64,

    /// Pages that ended in `Failed` after exhausting their retries
    pub pages_failed: u64,

    /// Times a page was handed back to the queue
    pub retries: u64,

    /// Records written to the dataset
    pub records_persisted: u64,

    /// Records dropped by validation
    pub records_dropped: u64,

    /// Failure records written to the dataset
    pub failure_records: u64,

    /// Links added to the queue by link discovery
    pub links_enqueued: u64,
}

impl CrawlStatistics {
    /// Pages that reached a terminal state
    pub fn pages_finished(&self) -> u64 {
        self.pages_done + self.pages_failed
    }

    /// Share of finished pages that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        let finished = self.pages_finished();
        if finished == 0 {
            return 0.0;
        }
        (self.pages_done as f64 / finished as f64) * 100.0
    }
}

/// Thread-safe counters shared by the page workers
#[derive(Debug, Default)]
pub struct StatsCollector {
    seeds_enqueued: AtomicU64,
    pages_done: AtomicU64,
    pages_failed: AtomicU64,
    retries: AtomicU64,
    records_persisted: AtomicU64,
    records_dropped: AtomicU64,
    failure_records: AtomicU64,
    links_enqueued: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_seed(&self) {
        self.seeds_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_done(&self, persisted: usize, dropped: usize, enqueued: usize) {
        self.pages_done.fetch_add(1, Ordering::Relaxed);
        self.records_persisted
            .fetch_add(persisted as u64, Ordering::Relaxed);
        self.records_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        self.links_enqueued.fetch_add(enqueued as u64, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_failed(&self, failure_record_persisted: bool) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
        if failure_record_persisted {
            self.failure_records.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns a copy of the current counters
    pub fn snapshot(&self) -> CrawlStatistics {
        CrawlStatistics {
            seeds_enqueued: self.seeds_enqueued.load(Ordering::Relaxed),
            pages_done: self.pages_done.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            failure_records: self.failure_records.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
        }
    }
}

/// Statistics of a finished run, read from the dataset
#[derive(Debug, Clone)]
pub struct DatasetStatistics {
    pub run: RunRecord,

    /// Content records of the run
    pub records: u64,

    /// Failure records of the run
    pub failures: u64,

    /// Distinct URLs among the content records
    pub distinct_urls: u64,
}

/// Loads statistics of the latest run from the dataset
///
/// Returns `Ok(None)` if the dataset holds no run yet.
pub fn load_statistics(dataset: &dyn Dataset) -> Result<Option<DatasetStatistics>, SyncError> {
    let Some(run) = dataset.get_latest_run()? else {
        return Ok(None);
    };

    let records = dataset.count_records(run.id)?;
    let failures = dataset.count_failures(run.id)?;
    let distinct_urls = dataset.count_distinct_urls(run.id)?;

    Ok(Some(DatasetStatistics {
        run,
        records,
        failures,
        distinct_urls,
    }))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Latest run:");
    println!("  Run ID: {}", stats.run.id);
    println!("  Crawler: {}", stats.run.crawler_name);
    println!("  Status: {}", stats.run.status);
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!();

    println!("Records:");
    println!("  Content records: {}", stats.records);
    println!("  Distinct URLs: {}", stats.distinct_urls);
    println!("  Failed pages: {}", stats.failures);
    println!();

    let pages = stats.distinct_urls + stats.failures;
    let success_rate = if pages > 0 {
        (stats.distinct_urls as f64 / pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages produced records)",
        success_rate, stats.distinct_urls, pages
    );
}
