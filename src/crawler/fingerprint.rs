//! Exact-duplicate detection over page bodies

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// SHA-256 digest of a page body
pub type Fingerprint = [u8; 32];

/// Computes the fingerprint of raw page bytes
pub fn fingerprint(content: &[u8]) -> Fingerprint {
    Sha256::digest(content).into()
}

/// Process-wide set of page fingerprints
///
/// Shared by every worker. Fingerprints are never removed.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    seen: Mutex<HashSet<Fingerprint>>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a page body, returning `true` if it had not been seen before
    ///
    /// Check and insert happen under one lock, so of two workers recording the
    /// same body exactly one sees `true`.
    pub fn record(&self, content: &[u8]) -> bool {
        let digest = fingerprint(content);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(digest)
    }

    /// Number of distinct bodies recorded
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
