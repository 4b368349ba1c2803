//! Clock-driven TTL cache on a concurrent map
//!
//! Expiry is checked lazily on read against an injected [`Clock`], so tests
//! can step past a TTL without sleeping.

use crate::{CacheStats, Counters, SnapshotCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pulse_facts::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// TTL cache keyed by string
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<V> TtlCache<V> {
    /// Create new cache reading the system clock
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create new cache reading `clock`
    #[inline]
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            counters: Counters::default(),
        }
    }

    /// Drop every entry whose TTL has passed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> SnapshotCache<V> for TtlCache<V>
where
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        // the shard guard must be released before an expired entry is removed
        let live = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));
        let hit = match live {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                None
            }
            None => None,
        };
        self.counters.record(hit.is_some());
        hit
    }

    async fn set(&self, key: String, value: V, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(key, Entry { value, expires_at });
    }

    async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn invalidate_all(&self) {
        self.entries.clear();
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len() as u64)
    }
}
