//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: persisted state of a frontier URL (queued or complete)
//! - `HostSchedule`: per-host FIFO queues ordered by the instant each host
//!   next becomes eligible for a request

mod entry_state;
mod host_schedule;

// Re-export main types
pub use entry_state::EntryState;
pub use host_schedule::{HostSchedule, SchedulePoll};
