//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Dataset trait.

use crate::record::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Dataset, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, crawler_name, status";

/// SQLite record dataset
pub struct SqliteDataset {
    conn: Connection,
}

impl SqliteDataset {
    /// Opens or creates the dataset at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory dataset
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_payloads(&self, run_id: i64, failures: bool) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM records WHERE run_id = ?1 AND is_failure = ?2 ORDER BY id",
        )?;

        let payloads = stmt
            .query_map(params![run_id, failures], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str::<Record>(payload).map_err(StorageError::from))
            .collect()
    }

    fn count(&self, run_id: i64, failures: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE run_id = ?1 AND is_failure = ?2",
            params![run_id, failures],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        crawler_name: row.get(4)?,
        status: row.get::<_, String>(5)?.parse().unwrap_or(RunStatus::Failed),
    })
}

impl Dataset for SqliteDataset {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, crawler_name: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, crawler_name, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, crawler_name, RunStatus::Running.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn push_records(&mut self, run_id: i64, records: &[Record]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (run_id, url, is_failure, payload, pushed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                let payload = serde_json::to_string(record)?;
                stmt.execute(params![run_id, record.url(), record.is_failure(), payload, now])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn load_records(&self, run_id: i64) -> StorageResult<Vec<Record>> {
        self.load_payloads(run_id, false)
    }

    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<Record>> {
        self.load_payloads(run_id, true)
    }

    // ===== Statistics =====

    fn count_records(&self, run_id: i64) -> StorageResult<u64> {
        self.count(run_id, false)
    }

    fn count_failures(&self, run_id: i64) -> StorageResult<u64> {
        self.count(run_id, true)
    }

    fn count_distinct_urls(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT url) FROM records WHERE run_id = ?1 AND is_failure = 0",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
