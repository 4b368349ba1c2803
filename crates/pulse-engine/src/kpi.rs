//! Periodic KPI snapshots
//!
//! A background job that aggregates a trailing window on a fixed interval and
//! hands each result to a [`KpiSink`]. Errors are logged and the loop keeps
//! going; it only stops when the shutdown signal flips.

use crate::aggregator::{MetricsAggregator, PeriodStatistics};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_facts::{Clock, DateRange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use ulid::Ulid;

/// One collected KPI record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub id: Ulid,
    pub taken_at: DateTime<Utc>,
    pub period: DateRange,
    pub statistics: PeriodStatistics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

/// Destination for collected snapshots
#[async_trait]
pub trait KpiSink: Send + Sync + std::fmt::Debug {
    async fn publish(&self, snapshot: KpiSnapshot) -> Result<()>;
}

/// Sink that keeps snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryKpiSink {
    snapshots: Mutex<Vec<KpiSnapshot>>,
}

impl MemoryKpiSink {
    /// Create new empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first
    #[must_use]
    pub fn snapshots(&self) -> Vec<KpiSnapshot> {
        self.snapshots.lock().clone()
    }
}

#[async_trait]
impl KpiSink for MemoryKpiSink {
    async fn publish(&self, snapshot: KpiSnapshot) -> Result<()> {
        self.snapshots.lock().push(snapshot);
        Ok(())
    }
}

/// Interval job producing [`KpiSnapshot`]s
#[derive(Debug, Clone)]
pub struct KpiCollector {
    aggregator: MetricsAggregator,
    sink: Arc<dyn KpiSink>,
    clock: Arc<dyn Clock>,
    window_days: u32,
    every: Duration,
}

impl KpiCollector {
    /// Create new collector over a trailing `window_days` window
    #[must_use]
    pub fn new(
        aggregator: MetricsAggregator,
        sink: Arc<dyn KpiSink>,
        clock: Arc<dyn Clock>,
        window_days: u32,
    ) -> Self {
        Self {
            aggregator,
            sink,
            clock,
            window_days,
            every: Duration::from_secs(15 * 60),
        }
    }

    /// With collection interval
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, every: Duration) -> Self {
        self.every = every;
        self
    }

    /// Aggregate the current window and publish it
    ///
    /// # Errors
    /// Whatever the sink reports.
    pub async fn collect_once(&self) -> Result<KpiSnapshot> {
        let taken_at = self.clock.now();
        let period = DateRange::hour_aligned_trailing(taken_at, self.window_days);
        let report = self.aggregator.aggregate(period, None).await;
        let snapshot = KpiSnapshot {
            id: Ulid::from_datetime(SystemTime::from(taken_at)),
            taken_at,
            period,
            statistics: report.statistics,
            degraded: report.degraded,
        };
        self.sink.publish(snapshot.clone()).await?;
        Ok(snapshot)
    }

    /// Collect on every tick until `shutdown` becomes `true` or its sender
    /// is dropped
    ///
    /// Returns the number of snapshots published.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut published = 0;
        tracing::info!("KPI collector started, every {:?}", self.every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.collect_once().await {
                        Ok(snapshot) => {
                            published += 1;
                            tracing::debug!("published KPI snapshot {}", snapshot.id);
                        }
                        Err(e) => tracing::warn!("KPI collection failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("KPI collector stopped after {} snapshots", published);
        published
    }
}
