//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Frontier entry persistence (queued / complete)
//! - Run tracking and resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::state::EntryState;
use crate::CrawlerError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlerError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlerError> {
    Ok(SqliteStorage::new(path)?)
}

/// A persisted frontier entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierRecord {
    pub url: String,
    pub state: EntryState,
    /// Row id, which follows insertion order; used to rebuild FIFO order on resume
    pub seq: i64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
