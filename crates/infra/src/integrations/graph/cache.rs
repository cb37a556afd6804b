//! TTL cache for raw calendar responses
//!
//! Keyed by a hash of `(user, range)`. Entries expire lazily: a lookup past
//! the TTL removes the entry and reports a miss. There is no background sweep.
//!
//! Concurrent misses for the same key may both fetch; the later write wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use eventkit_common::time::{Clock, SystemClock};
use eventkit_domain::constants::RESPONSE_CACHE_TTL_SECS;
use eventkit_domain::DateRange;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    events: Arc<Vec<Value>>,
    inserted_at: Instant,
}

/// Counters for operators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(RESPONSE_CACHE_TTL_SECS))
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Cache reading time from `clock` (tests pass a `MockClock`)
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable key for a calendar query.
    pub fn key(user_id: &str, range: &DateRange) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(range.start.to_rfc3339().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(range.end.to_rfc3339().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Live entry for `key`, evicting it if it has outlived the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<Value>>> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %short(key), "Response cache hit");
                return Some(Arc::clone(&entry.events));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // Only drop the entry we judged stale; a concurrent insert may have replaced it
            let removed = self.entries.remove_if(key, |_, entry| {
                now.saturating_duration_since(entry.inserted_at) >= self.ttl
            });
            if removed.is_some() {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            debug!(key = %short(key), "Response cache entry expired");
        } else {
            debug!(key = %short(key), "Response cache miss");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace the entry for `key`.
    pub fn insert(&self, key: String, events: Vec<Value>) -> Arc<Vec<Value>> {
        let events = Arc::new(events);
        self.entries.insert(
            key,
            CacheEntry { events: Arc::clone(&events), inserted_at: self.clock.now() },
        );
        events
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        debug!(dropped, "Cleared response cache");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}
