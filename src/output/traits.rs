//! Output sink traits and types
//!
//! This module defines the trait interface for discovered-link sinks and the
//! data carried by the end-of-run summary.

use crate::output::stats::StatsSnapshot;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output sink lock poisoned")]
    Poisoned,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for URLs discovered while crawling
///
/// Every URL that survives the filter is recorded once per discovery, before it
/// is offered to the frontier. Implementations are shared between workers.
pub trait LinkSink: Send + Sync {
    /// Records one discovered URL
    fn record(&self, url: &Url) -> OutputResult<()>;

    /// Flushes buffered output
    fn flush(&self) -> OutputResult<()> {
        Ok(())
    }
}

/// End-of-run report
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Row id in the runs table
    pub run_id: i64,

    /// Wall-clock time the crawl took
    pub duration: Duration,

    /// Root domain used for subdomain counting
    pub root_domain: String,

    /// Aggregated page statistics
    pub stats: StatsSnapshot,

    /// Entries in the Complete state at the end of the run
    pub completed: usize,

    /// Entries still Queued at the end of the run
    pub queued: usize,

    /// Workers that ended with a fault
    pub worker_faults: usize,
}

impl RunSummary {
    /// Returns the crawl rate in pages per second
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.stats.unique_pages as f64 / secs
    }
}
