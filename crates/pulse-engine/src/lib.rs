//! Helpdesk Pulse Engine
//!
//! Predictive operations analytics for an IT helpdesk: aggregated dashboard
//! statistics, trends with seasonality and forecasts, bottleneck detection
//! and staffing predictions, all computed from read-only ticket facts.
//!
//! # Architecture
//!
//! ```text
//! FactSource ──┬──► MetricsAggregator ──► PeriodStatistics ─┐
//!              ├──► series ──► TrendResult ─────────────────┼──► DashboardSnapshot (cached)
//!              ├──► BottleneckDetectorSet ──► records ──────┤
//!              └──► WorkloadPatterns ───────────────────────┘
//! WorkforceProvider ──► CapacityPredictor ──► CapacityForecast
//! ```
//!
//! Every fan-out branch catches its own upstream failure and falls back to a
//! default, so the dashboard always returns; the names of degraded branches
//! are listed on the snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_engine::AnalyticsEngine;
//!
//! let engine = AnalyticsEngine::builder(facts, workforce).build()?;
//! let snapshot = engine.dashboard_metrics(None).await?;
//! println!("{} tickets", snapshot.statistics.volume.total_tickets);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregator;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod patterns;

pub use aggregator::{
    bucketize, AggregateReport, MetricsAggregator, PeriodStatistics, RealtimeCounts, ResolutionStats,
    StatisticsFilter, TrendDeltas, VolumeStats,
};
pub use capacity::{
    ActionKind, CapacityAction, CapacityForecast, CapacityInputs, CapacityPredictor, CapacityRisk, RiskKind,
    Urgency,
};
pub use config::{ConfigError, EngineConfig, WorkCalendar};
pub use engine::{
    require_forecast, AnalyticsEngine, AnalyticsEngineBuilder, DashboardSnapshot, MemberPerformance, TeamSnapshot,
    TeamTotals,
};
pub use error::{AnalyticsError, Result};
pub use kpi::{KpiCollector, KpiSink, KpiSnapshot, MemoryKpiSink};
pub use patterns::WorkloadPatterns;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        AnalyticsEngine, AnalyticsError, CapacityForecast, DashboardSnapshot, EngineConfig, Result,
        TeamSnapshot,
    };
    pub use pulse_bottleneck::{BottleneckRecord, Dimension, Severity};
    pub use pulse_facts::{DateRange, FactSource, Granularity, Metric, TicketFact, WorkforceProvider};
    pub use pulse_series::{TrendDirection, TrendResult};
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_facts::{DateRange, ManualClock, MemoryFactSource, StaticWorkforce, TicketFact, WorkforceCapacity};
    use std::sync::Arc;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn snapshot_serializes_with_flattened_statistics() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let facts = vec![TicketFact::new("1", "email", "acme", now - chrono::Duration::hours(2))];
        let engine = AnalyticsEngine::builder(
            Arc::new(MemoryFactSource::new(facts)),
            Arc::new(StaticWorkforce::new(WorkforceCapacity::new(2, 40.0))),
        )
        .clock(Arc::new(ManualClock::new(now)))
        .build()
        .unwrap();

        let snapshot = engine
            .dashboard_metrics(Some(DateRange::trailing_days(now, 7)))
            .await
            .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["statistics"]["total_tickets"], 1);
        assert_eq!(json["statistics"]["utilization_rate"], 40.0);
        assert_eq!(json["volume_trend"]["samples"].as_array().unwrap().len(), 7);
        assert!(snapshot.degraded.is_empty());
    }
}
