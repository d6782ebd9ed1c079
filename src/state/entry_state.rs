/// Frontier entry state definitions
///
/// A URL enters the frontier as `Queued` and leaves it as `Complete`. There is
/// no way back: a complete URL is never offered again.
use std::fmt;

/// Represents the persisted state of a URL in the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Discovered and waiting to be fetched (or currently in flight)
    Queued,

    /// Fetched or otherwise finished; never re-enqueued
    Complete,
}

impl EntryState {
    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Complete => "complete",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
