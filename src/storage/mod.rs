//! Storage module for the record dataset
//!
//! This module persists what a crawl produces:
//! - SQLite database initialization and schema management
//! - Run tracking (start, finish, status, config hash)
//! - Append-only record and failure-record storage

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteDataset;
pub use traits::{Dataset, StorageError, StorageResult};

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// A dataset shared by the page workers of one crawl
pub type SharedDataset = Arc<Mutex<dyn Dataset + Send>>;

/// Opens (or creates) a record dataset
pub fn open_dataset(path: &Path) -> StorageResult<SqliteDataset> {
    SqliteDataset::new(path)
}

/// One crawl recorded in the dataset
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub crawler_name: String,
    pub status: RunStatus,
}

/// Lifecycle of a dataset run; stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The crawl is in progress, or the process died during it
    Running,
    /// The queue was drained
    Completed,
    /// The crawl was stopped before the queue drained
    Aborted,
    /// The crawl stopped on an error
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Running, Self::Completed, Self::Aborted, Self::Failed]
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StorageError::Database(format!("unknown run status '{}'", s)))
    }
}
