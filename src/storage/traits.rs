//! Storage traits and error types
//!
//! This module defines the trait interface for record dataset backends and
//! associated error types.

use crate::record::Record;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record dataset backends
///
/// The dataset is append-only: records pushed for a run are never modified.
/// Callers share one dataset between pages behind a mutex.
pub trait Dataset {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `crawler_name` - Identity the run's records are stamped with
    fn create_run(&mut self, config_hash: &str, crawler_name: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Records =====

    /// Appends one page's records in a single transaction
    ///
    /// Either every record is stored or none is.
    fn push_records(&mut self, run_id: i64, records: &[Record]) -> StorageResult<()>;

    /// Loads the content records of a run, in push order
    fn load_records(&self, run_id: i64) -> StorageResult<Vec<Record>>;

    /// Loads the failure records of a run, in push order
    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<Record>>;

    // ===== Statistics =====

    /// Counts the content records of a run
    fn count_records(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts the failure records of a run
    fn count_failures(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts the distinct URLs with content records in a run
    fn count_distinct_urls(&self, run_id: i64) -> StorageResult<u64>;
}
