//! moka-backed cache with per-entry expiry

use crate::{CacheStats, Counters, SnapshotCache};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expire each entry after the TTL it was stored with
struct PerEntryTtl;

impl<V> Expiry<String, Timed<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Timed<V>, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded snapshot cache on moka's async cache
///
/// Expiry follows the wall clock; use [`crate::TtlCache`] when time has to be
/// controlled.
#[derive(Debug, Clone)]
pub struct MokaCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, Timed<V>>,
    counters: std::sync::Arc<Counters>,
}

impl<V: Clone + Send + Sync + 'static> MokaCache<V> {
    /// Create new cache with max capacity
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
            counters: std::sync::Arc::default(),
        }
    }

    /// Flush moka's pending maintenance so counts are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MokaCache<V> {
    /// Create cache with default capacity (1,000 snapshots)
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl<V> SnapshotCache<V> for MokaCache<V>
where
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let hit = self.inner.get(key).await.map(|timed| timed.value);
        self.counters.record(hit.is_some());
        hit
    }

    async fn set(&self, key: String, value: V, ttl: Duration) {
        self.inner.insert(key, Timed { value, ttl }).await;
    }

    async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    async fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.inner.entry_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get() {
        let cache = MokaCache::<u32>::new(16);
        cache.set("a".into(), 7, Duration::from_secs(60)).await;
        assert_eq!(cache.get("a").await, Some(7));
        assert_eq!(cache.get("b").await, None);

        cache.sync().await;
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn short_ttl_expires() {
        let cache = MokaCache::<u32>::default();
        cache.set("a".into(), 1, Duration::from_millis(20)).await;
        cache.set("b".into(), 2, Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
    }

    #[tokio::test]
    async fn invalidation() {
        let cache = MokaCache::<u32>::default();
        cache.set("a".into(), 1, Duration::from_secs(60)).await;
        cache.set("b".into(), 2, Duration::from_secs(60)).await;
        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);

        cache.invalidate_all().await;
        assert_eq!(cache.get("b").await, None);
    }
}
