//! Keyed counter storage for rate limiting.
//!
//! # Responsibilities
//! - Map an opaque key to a `RateLimitEntry` (count + reset time)
//! - Reset an entry wholesale once its window has passed
//! - Expire entries lazily on read, and eagerly through `purge_expired`
//!
//! # Design Decisions
//! - `now > reset_time` is the only staleness test; a request landing exactly
//!   on `reset_time` still belongs to the old window
//! - `increment` runs entirely under the DashMap shard lock for its key, so
//!   concurrent requests never interleave between the check and the write
//! - State is per process; replicas each keep their own counters

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::security::clock::{window_end, Clock};

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u64,
    pub reset_time: DateTime<Utc>,
}

impl RateLimitEntry {
    fn fresh(now: DateTime<Utc>, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_time: window_end(now, window_ms),
        }
    }

    /// Whether the window has closed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_time
    }
}

/// Storage backend for rate-limit counters.
///
/// The in-memory map is the only backend shipped; a shared networked counter
/// can implement this trait without touching the gates.
pub trait RateLimitStore: Send + Sync {
    /// Count one hit against `key`, opening a new window when none is live.
    fn increment(&self, key: &str, window_ms: u64) -> RateLimitEntry;

    /// Live entry for `key`, if its window has not closed.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Forget `key` entirely.
    fn reset(&self, key: &str);

    /// Drop every entry whose window has closed. Returns how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }

    /// Number of physically stored entries, when the backend can tell.
    fn entry_count(&self) -> Option<usize> {
        None
    }
}

/// Process-local store backed by a concurrent hash map.
#[derive(Debug)]
pub struct InMemoryStore {
    entries: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RateLimitStore for InMemoryStore {
    fn increment(&self, key: &str, window_ms: u64) -> RateLimitEntry {
        let now = self.clock.now();

        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired_at(now) {
                    *entry = RateLimitEntry::fresh(now, window_ms);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
                *entry
            }
            Entry::Vacant(vacant) => *vacant.insert(RateLimitEntry::fresh(now, window_ms)),
        }
    }

    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|entry| *entry.value())
            .filter(|entry| !entry.is_expired_at(now))
    }

    fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = !entry.is_expired_at(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, InMemoryStore) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = InMemoryStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn test_first_increment_opens_window() {
        let (clock, store) = store();
        let entry = store.increment("k", 60_000);
        assert_eq!(entry.count, 1);
        assert_eq!((entry.reset_time - clock.now()).num_milliseconds(), 60_000);
    }

    #[test]
    fn test_increment_within_window_keeps_reset_time() {
        let (clock, store) = store();
        let first = store.increment("k", 60_000);
        clock.advance_ms(10_000);
        let second = store.increment("k", 60_000);
        assert_eq!(second.count, 2);
        assert_eq!(second.reset_time, first.reset_time);
    }

    #[test]
    fn test_request_at_reset_time_stays_in_window() {
        let (clock, store) = store();
        store.increment("k", 1_000);
        clock.advance_ms(1_000);
        assert_eq!(store.increment("k", 1_000).count, 2);

        clock.advance_ms(1);
        let refreshed = store.increment("k", 1_000);
        assert_eq!(refreshed.count, 1);
        assert_eq!((refreshed.reset_time - clock.now()).num_milliseconds(), 1_000);
    }

    #[test]
    fn test_get_is_lazy_about_expiry() {
        let (clock, store) = store();
        store.increment("k", 1_000);
        clock.advance_ms(1_000);
        assert!(store.get("k").is_some());
        clock.advance_ms(1);
        assert!(store.get("k").is_none());
        // still physically present until a purge
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reset_removes_entry() {
        let (_clock, store) = store();
        store.increment("k", 1_000);
        store.increment("k", 1_000);
        store.reset("k");
        assert!(store.get("k").is_none());
        assert_eq!(store.increment("k", 1_000).count, 1);
    }

    #[test]
    fn test_purge_only_removes_closed_windows() {
        let (clock, store) = store();
        store.increment("short", 1_000);
        store.increment("long", 10_000);

        clock.advance_ms(1_000);
        assert_eq!(store.purge_expired(), 0);
        assert!(store.get("short").is_some());

        clock.advance_ms(1);
        assert_eq!(store.purge_expired(), 1);
        assert!(store.get("short").is_none());
        assert!(store.get("long").is_some());
        assert_eq!(store.entry_count(), Some(1));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (_clock, store) = store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.increment("shared", 60_000);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("shared").unwrap().count, 2_000);
    }
}
