//! Shared URL frontier
//!
//! The frontier owns every URL the crawl has ever seen and hands them out to
//! workers while keeping requests to the same host at least `min_delay` apart.
//!
//! # Locking
//!
//! Two locks, never held together and never held across an await:
//! - `inner` guards the in-memory structure (states, host schedule, in-flight set)
//! - `store` guards the persistence backend
//!
//! Persistence happens after `inner` is released. The store's writes are order
//! independent, so a late queued write can never overwrite a complete row.

use crate::state::{EntryState, HostSchedule, SchedulePoll};
use crate::storage::FrontierStore;
use crate::url::{extract_host, normalize_url};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// Progress is logged each time this many URLs have been dispatched
const PROGRESS_INTERVAL: u64 = 100;

#[derive(Debug)]
struct FrontierInner {
    schedule: HostSchedule,
    states: HashMap<String, EntryState>,
    in_flight: HashSet<String>,
    queued: usize,
    completed: usize,
    dispatched: u64,
}

impl FrontierInner {
    fn new(min_delay: Duration) -> Self {
        Self {
            schedule: HostSchedule::new(min_delay),
            states: HashMap::new(),
            in_flight: HashSet::new(),
            queued: 0,
            completed: 0,
            dispatched: 0,
        }
    }

    /// Inserts a URL as queued unless it is already known
    fn enqueue(&mut self, url: Url, now: Instant) -> bool {
        let key = url.to_string();
        if self.states.contains_key(&key) {
            return false;
        }

        let host = extract_host(&url).unwrap_or_default();
        self.states.insert(key, EntryState::Queued);
        self.schedule.push(&host, url, now);
        self.queued += 1;
        true
    }

    fn restore_complete(&mut self, key: String) {
        if self.states.insert(key, EntryState::Complete).is_none() {
            self.completed += 1;
        }
    }
}

/// Thread-safe crawl frontier with per-host politeness and persistence
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    store: Mutex<Box<dyn FrontierStore>>,
    changed: Notify,
}

impl Frontier {
    /// Opens the frontier over a persistence backend
    ///
    /// With `resume` and a non-empty store, complete entries are remembered
    /// (and never handed out again) while queued entries are offered in their
    /// original order. Otherwise the store is cleared and the frontier is seeded.
    /// Host timers always start fresh.
    ///
    /// # Arguments
    ///
    /// * `store` - The persistence backend
    /// * `seeds` - URLs to start from on a fresh crawl
    /// * `resume` - Whether to continue from persisted state
    /// * `min_delay` - Minimum spacing between two requests to one host
    pub fn open(
        mut store: Box<dyn FrontierStore>,
        seeds: &[String],
        resume: bool,
        min_delay: Duration,
    ) -> Result<Self> {
        let entries = if resume { store.load_entries()? } else { Vec::new() };
        let mut inner = FrontierInner::new(min_delay);
        let now = Instant::now();

        if entries.is_empty() {
            store.clear_entries()?;
            for seed in seeds {
                let url = normalize_url(seed)?;
                let key = url.to_string();
                if inner.enqueue(url, now) {
                    store.insert_queued(&key)?;
                }
            }
            tracing::info!("Seeded frontier with {} URLs", inner.queued);
        } else {
            for entry in entries {
                match entry.state {
                    EntryState::Complete => inner.restore_complete(entry.url),
                    EntryState::Queued => match normalize_url(&entry.url) {
                        Ok(url) => {
                            inner.enqueue(url, now);
                        }
                        Err(e) => {
                            tracing::warn!("Dropping unreadable saved URL {}: {}", entry.url, e);
                        }
                    },
                }
            }
            tracing::info!(
                "Resumed frontier: {} queued, {} complete",
                inner.queued,
                inner.completed
            );
        }

        Ok(Self {
            inner: Mutex::new(inner),
            store: Mutex::new(store),
            changed: Notify::new(),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_store(&self) -> MutexGuard<'_, Box<dyn FrontierStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a URL to the frontier
    ///
    /// Returns `false` if the URL is already queued, in flight, or complete.
    /// Of several concurrent calls with the same URL exactly one returns `true`.
    pub fn add_url(&self, url: &str) -> Result<bool> {
        let url = normalize_url(url)?;
        let key = url.to_string();

        let added = self.lock_inner().enqueue(url, Instant::now());
        if !added {
            return Ok(false);
        }

        self.changed.notify_waiters();
        self.lock_store().insert_queued(&key)?;
        tracing::trace!("Queued {}", key);
        Ok(true)
    }

    /// Waits for the next URL that may be fetched now
    ///
    /// Returns `None` once nothing is queued and nothing is in flight. While
    /// every queued host is cooling down, or while the queue is empty but other
    /// workers may still discover links, the caller sleeps without holding any
    /// lock and wakes early on any frontier change.
    pub async fn next_url(&self) -> Option<Url> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait = {
                let mut guard = self.lock_inner();
                let inner = &mut *guard;
                let states = &inner.states;
                // Entries completed while waiting in the queue are dropped
                let polled = inner.schedule.poll(Instant::now(), |url| {
                    states.get(url.as_str()) == Some(&EntryState::Complete)
                });
                match polled {
                    SchedulePoll::Ready(url) => {
                        let key = url.to_string();
                        inner.queued = inner.queued.saturating_sub(1);
                        inner.in_flight.insert(key);
                        inner.dispatched += 1;
                        if inner.dispatched % PROGRESS_INTERVAL == 0 {
                            tracing::info!(
                                "Progress: {} dispatched, {} queued, {} in flight, {} complete",
                                inner.dispatched,
                                inner.queued,
                                inner.in_flight.len(),
                                inner.completed
                            );
                        }
                        return Some(url);
                    }
                    SchedulePoll::Wait(wait) => Some(wait),
                    SchedulePoll::Empty if inner.in_flight.is_empty() => return None,
                    SchedulePoll::Empty => None,
                }
            };

            match wait {
                Some(duration) => {
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {}
                        _ = &mut notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Marks a URL as complete
    ///
    /// The in-memory transition happens before persistence, so the URL leaves
    /// the in-flight set even if the write fails. Idempotent.
    pub fn mark_complete(&self, url: &Url) -> Result<()> {
        let key = match normalize_url(url.as_str()) {
            Ok(normalized) => normalized.to_string(),
            Err(_) => url.to_string(),
        };

        {
            let mut inner = self.lock_inner();
            let was_in_flight = inner.in_flight.remove(&key);
            let previous = inner.states.insert(key.clone(), EntryState::Complete);
            match previous {
                Some(EntryState::Complete) => {}
                Some(EntryState::Queued) => {
                    if !was_in_flight {
                        inner.queued = inner.queued.saturating_sub(1);
                    }
                    inner.completed += 1;
                }
                None => inner.completed += 1,
            }
        }

        self.changed.notify_waiters();
        self.lock_store().mark_complete(&key)?;
        Ok(())
    }

    /// Number of URLs waiting to be dispatched
    pub fn queued_len(&self) -> usize {
        self.lock_inner().queued
    }

    /// Number of URLs handed out and not yet complete
    pub fn in_flight_len(&self) -> usize {
        self.lock_inner().in_flight.len()
    }

    /// Number of complete URLs
    pub fn completed_len(&self) -> usize {
        self.lock_inner().completed
    }

    /// Returns whether the frontier has nothing left to hand out or wait for
    pub fn is_finished(&self) -> bool {
        let inner = self.lock_inner();
        inner.queued == 0 && inner.in_flight.is_empty()
    }

    /// Returns the persisted state of a URL, if it is known
    pub fn state_of(&self, url: &str) -> Option<EntryState> {
        let key = normalize_url(url).ok()?.to_string();
        self.lock_inner().states.get(&key).copied()
    }

    /// Runs a closure against the persistence backend
    pub fn with_store<R>(&self, f: impl FnOnce(&mut dyn FrontierStore) -> R) -> R {
        let mut store = self.lock_store();
        f(store.as_mut())
    }
}
