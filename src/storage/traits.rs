//! Storage traits and error types
//!
//! This module defines the trait interface for frontier persistence and
//! associated error types.

use crate::state::EntryState;
use crate::storage::{FrontierRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown entry state '{state}' for {url}")]
    UnknownState { url: String, state: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of frontier entries and crawl runs
///
/// Writes must be order independent: recording a URL as queued never
/// overwrites an existing row, while marking it complete always wins. The
/// frontier relies on this to persist outside its structural lock.
pub trait FrontierStore: Send {
    // ===== Frontier Entries =====

    /// Records a URL as queued unless a row for it already exists
    ///
    /// Returns true if a new row was written.
    fn insert_queued(&mut self, url: &str) -> StorageResult<bool>;

    /// Records a URL as complete, inserting the row if needed
    fn mark_complete(&mut self, url: &str) -> StorageResult<()>;

    /// Loads every entry in insertion order
    fn load_entries(&self) -> StorageResult<Vec<FrontierRecord>>;

    /// Counts entries in a given state
    fn count_by_state(&self, state: EntryState) -> StorageResult<u64>;

    /// Removes every entry (fresh start)
    fn clear_entries(&mut self) -> StorageResult<()>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;
}
