//! Output module for crawl statistics and sync summaries
//!
//! This module handles:
//! - Live crawl counters shared by the page workers
//! - Dataset statistics of the latest run
//! - Markdown summaries of a sync

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary, SyncSummary};
pub use stats::{
    load_statistics, print_statistics, CrawlStatistics, DatasetStatistics, StatsCollector,
};
