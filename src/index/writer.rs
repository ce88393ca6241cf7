use crate::index::client::require_object_id;
use crate::index::{DiffResult, IndexError, SearchIndex};
use crate::record::Record;
use crate::SyncError;
use std::fmt;

/// One of the three bulk operations applied to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOperation {
    Add,
    Update,
    Remove,
}

impl WriteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the writer did to the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,

    /// Operations that issued a call, in order
    pub applied: Vec<WriteOperation>,
}

/// Applies a diff to the index: add, then update, then remove
///
/// Empty sets issue no call. The first failing operation stops the rest and
/// is reported as `IndexWrite`, listing the operations already applied.
pub async fn apply_diff(index: &dyn SearchIndex, diff: &DiffResult) -> Result<WriteReport, SyncError> {
    let mut report = WriteReport::default();

    if !diff.to_add.is_empty() {
        let records: Vec<Record> = diff.to_add.values().cloned().collect();
        log_urls("Adding", diff.to_add.keys());
        index
            .save_objects(&records, true)
            .await
            .map_err(|source| write_error(WriteOperation::Add, &report, source))?;
        report.added = records.len();
        report.applied.push(WriteOperation::Add);
    }

    if !diff.to_update.is_empty() {
        let records: Vec<Record> = diff.to_update.values().cloned().collect();
        log_urls("Updating", diff.to_update.keys());
        index
            .save_objects(&records, false)
            .await
            .map_err(|source| write_error(WriteOperation::Update, &report, source))?;
        report.updated = records.len();
        report.applied.push(WriteOperation::Update);
    }

    if !diff.to_remove.is_empty() {
        let object_ids = diff
            .to_remove
            .values()
            .map(require_object_id)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| write_error(WriteOperation::Remove, &report, source))?;
        log_urls("Removing", diff.to_remove.keys());
        index
            .delete_objects(&object_ids)
            .await
            .map_err(|source| write_error(WriteOperation::Remove, &report, source))?;
        report.removed = object_ids.len();
        report.applied.push(WriteOperation::Remove);
    }

    tracing::info!(
        "Index updated: {} added, {} updated, {} removed",
        report.added,
        report.updated,
        report.removed
    );

    Ok(report)
}

fn write_error(operation: WriteOperation, report: &WriteReport, source: IndexError) -> SyncError {
    tracing::error!("Index {} failed: {}", operation, source);
    SyncError::IndexWrite {
        operation,
        applied: report.applied.clone(),
        source,
    }
}

fn log_urls<'a>(action: &str, urls: impl ExactSizeIterator<Item = &'a String>) {
    tracing::info!("{} {} record(s) in the index", action, urls.len());
    for url in urls {
        tracing::debug!("{} {}", action, url);
    }
}
