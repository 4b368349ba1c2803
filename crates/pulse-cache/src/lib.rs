//! Pulse Cache
//!
//! TTL-keyed memoization for composed dashboard snapshots.
//!
//! Two interchangeable [`SnapshotCache`] implementations:
//!
//! - [`TtlCache`]: `DashMap` plus an injected [`pulse_facts::Clock`]; expiry is
//!   deterministic under a manual clock
//! - [`MokaCache`]: moka's async cache with per-entry expiry and a capacity
//!   bound
//!
//! There is no stampede protection: concurrent misses each compute and the
//! last write wins.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod moka_cache;
mod ttl;

pub use moka_cache::MokaCache;
pub use ttl::TtlCache;

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Share of lookups served from cache, in `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Keyed store of values that expire after a per-entry TTL
#[async_trait]
pub trait SnapshotCache<V>: Send + Sync + Debug
where
    V: Clone + Send + Sync + 'static,
{
    /// Live value under `key`
    async fn get(&self, key: &str) -> Option<V>;

    /// Store `value`, replacing any previous entry
    async fn set(&self, key: String, value: V, ttl: Duration);

    async fn invalidate(&self, key: &str);

    async fn invalidate_all(&self);

    fn stats(&self) -> CacheStats;
}

/// Serve `key` from `cache`, or compute and store it
///
/// Errors from `compute` are returned and nothing is cached.
pub async fn get_or_try_insert<V, E, C, F, Fut>(
    cache: &C,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<V, E>
where
    V: Clone + Send + Sync + 'static,
    C: SnapshotCache<V> + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(cached) = cache.get(key).await {
        tracing::debug!("cache hit: {}", key);
        return Ok(cached);
    }
    tracing::debug!("cache miss: {}", key);
    let value = compute().await?;
    cache.set(key.to_string(), value.clone(), ttl).await;
    Ok(value)
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            entry_count,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_facts::ManualClock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_or_try_insert_computes_once() {
        let cache = TtlCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: Result<String, ()> = get_or_try_insert(&cache, "k", Duration::from_secs(60), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("computed".to_string())
            })
            .await;
            assert_eq!(value.as_deref(), Ok("computed"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!((cache.stats().hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = TtlCache::<u32>::new();
        let failed: Result<u32, &str> =
            get_or_try_insert(&cache, "k", Duration::from_secs(60), || async { Err("down") }).await;
        assert_eq!(failed, Err("down"));
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let caches: Vec<Box<dyn SnapshotCache<u32>>> =
            vec![Box::new(TtlCache::with_clock(clock)), Box::new(MokaCache::new(8))];
        for cache in caches {
            cache.set("n".into(), 5, Duration::from_secs(60)).await;
            let n: Result<u32, ()> =
                get_or_try_insert(cache.as_ref(), "n", Duration::from_secs(60), || async { Ok(0) }).await;
            assert_eq!(n, Ok(5));
        }
    }
}
