use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// A URL waiting in its host's queue
#[derive(Debug, Clone)]
struct QueuedUrl {
    url: Url,

    /// Global insertion order, used to keep dispatch FIFO across hosts
    seq: u64,
}

/// Heap slot for a host with at least one queued URL
///
/// Ordered by eligibility first, then by the insertion order of the host's
/// front URL. Wrapped in `Reverse` so the heap pops the earliest slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HostSlot {
    eligible_at: Instant,
    seq: u64,
    host: String,
}

/// Outcome of asking the schedule for the next URL
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulePoll {
    /// A URL whose host may be requested now
    Ready(Url),

    /// Every queued host is cooling down; the earliest is eligible after this long
    Wait(Duration),

    /// Nothing is queued
    Empty,
}

/// Per-host politeness scheduler
///
/// Each host owns a FIFO queue. A min-heap holds exactly one slot per host
/// with a non-empty queue, keyed by the instant that host next becomes
/// eligible. Popping therefore never scans cooling hosts, and the caller can
/// learn exactly how long to wait without holding any lock while it waits.
///
/// Invariant: two dispatches to the same host are at least `min_delay` apart.
#[derive(Debug)]
pub struct HostSchedule {
    min_delay: Duration,
    queues: HashMap<String, VecDeque<QueuedUrl>>,
    slots: BinaryHeap<Reverse<HostSlot>>,
    last_dispatch: HashMap<String, Instant>,
    next_seq: u64,
    len: usize,
}

impl HostSchedule {
    /// Creates an empty schedule with the given per-host delay
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            queues: HashMap::new(),
            slots: BinaryHeap::new(),
            last_dispatch: HashMap::new(),
            next_seq: 0,
            len: 0,
        }
    }

    /// Appends a URL to its host's queue
    ///
    /// A host that had nothing queued gets a slot eligible at the later of
    /// `now` and its last dispatch plus the delay.
    pub fn push(&mut self, host: &str, url: Url, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.len += 1;

        let queue = self.queues.entry(host.to_string()).or_default();
        let was_empty = queue.is_empty();
        queue.push_back(QueuedUrl { url, seq });

        if was_empty {
            let eligible_at = match self.last_dispatch.get(host) {
                Some(last) => std::cmp::max(now, *last + self.min_delay),
                None => now,
            };
            self.slots.push(Reverse(HostSlot {
                eligible_at,
                seq,
                host: host.to_string(),
            }));
        }
    }

    /// Takes the next URL whose host is eligible at `now`
    ///
    /// URLs for which `skip` returns true are dropped without counting as a
    /// dispatch, so their host keeps its current eligibility. On success the
    /// host's dispatch time is recorded as `now` and, if it still has queued
    /// URLs, its slot is re-armed `min_delay` later.
    pub fn poll(&mut self, now: Instant, mut skip: impl FnMut(&Url) -> bool) -> SchedulePoll {
        loop {
            let eligible_at = match self.slots.peek() {
                Some(Reverse(slot)) => slot.eligible_at,
                None => return SchedulePoll::Empty,
            };

            if eligible_at > now {
                return SchedulePoll::Wait(eligible_at - now);
            }

            let Some(Reverse(slot)) = self.slots.pop() else {
                return SchedulePoll::Empty;
            };

            // A slot always has a non-empty queue; anything else is dropped
            let Some(queue) = self.queues.get_mut(&slot.host) else {
                continue;
            };
            let Some(front) = queue.pop_front() else {
                self.queues.remove(&slot.host);
                continue;
            };
            self.len -= 1;

            let skipped = skip(&front.url);
            let next_eligible = if skipped {
                slot.eligible_at
            } else {
                self.last_dispatch.insert(slot.host.clone(), now);
                now + self.min_delay
            };

            match queue.front() {
                Some(next) => {
                    let seq = next.seq;
                    self.slots.push(Reverse(HostSlot {
                        eligible_at: next_eligible,
                        seq,
                        host: slot.host,
                    }));
                }
                None => {
                    self.queues.remove(&slot.host);
                }
            }

            if !skipped {
                return SchedulePoll::Ready(front.url);
            }
        }
    }

    /// Number of queued URLs across all hosts
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Instant of the last dispatch to a host, if any
    pub fn last_dispatch(&self, host: &str) -> Option<Instant> {
        self.last_dispatch.get(host).copied()
    }
}
