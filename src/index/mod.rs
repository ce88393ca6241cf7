//! Search index reconciliation
//!
//! This module keeps a search index in step with a fresh crawl:
//! - `client`: the `SearchIndex` capability and its HTTP implementation
//! - `snapshot`: reading every record a crawler identity owns
//! - `diff`: computing the add/update/remove sets
//! - `writer`: applying them with one bulk call each

mod client;
mod diff;
mod snapshot;
mod writer;

pub use client::{require_object_id, BrowsePage, HttpSearchIndex, IndexError, SearchIndex, MAX_BATCH_SIZE};
pub use diff::{compute_diff, records_differ, DiffResult};
pub use snapshot::{read_snapshot, IndexSnapshot};
pub use writer::{apply_diff, WriteOperation, WriteReport};

use crate::config::SnapshotErrors;
use crate::record::Record;
use crate::SyncError;

/// Settings of one reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Identity whose records are reconciled
    pub crawled_by: String,

    /// Hits per browse page
    pub browse_batch_size: u32,

    /// What to do when the snapshot cannot be read
    pub snapshot_errors: SnapshotErrors,

    /// Compute the diff without writing it
    pub dry_run: bool,
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records found in the index before writing
    pub snapshot_size: usize,

    /// Records the crawl produced
    pub crawled: usize,

    pub to_add: usize,
    pub to_update: usize,
    pub to_remove: usize,

    /// What was written; empty for a dry run
    pub write: WriteReport,
}

/// Reads the snapshot, diffs it against `records` and applies the diff
pub async fn reconcile(
    index: &dyn SearchIndex,
    records: &[Record],
    settings: &ReconcileSettings,
) -> Result<ReconcileReport, SyncError> {
    tracing::info!(
        "Reconciling {} record(s) for '{}'",
        records.len(),
        settings.crawled_by
    );

    let snapshot = read_snapshot(
        index,
        &settings.crawled_by,
        settings.browse_batch_size,
        settings.snapshot_errors,
    )
    .await?;

    let diff = compute_diff(&snapshot, records);
    tracing::info!(
        "Diff: {} to add, {} to update, {} to remove",
        diff.to_add.len(),
        diff.to_update.len(),
        diff.to_remove.len()
    );

    let mut report = ReconcileReport {
        snapshot_size: snapshot.len(),
        crawled: records.len(),
        to_add: diff.to_add.len(),
        to_update: diff.to_update.len(),
        to_remove: diff.to_remove.len(),
        write: WriteReport::default(),
    };

    if settings.dry_run {
        tracing::info!("Dry run: index left untouched");
        return Ok(report);
    }

    report.write = apply_diff(index, &diff).await?;
    Ok(report)
}
