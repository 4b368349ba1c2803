//! The analytics engine
//!
//! [`AnalyticsEngine`] is the one entry point callers use. It owns the
//! upstream handles, the dashboard cache and the clock, and composes the
//! aggregator, series algorithms, detectors and capacity rules into the five
//! exposed operations.

use crate::aggregator::{MetricsAggregator, PeriodStatistics};
use crate::capacity::{CapacityForecast, CapacityInputs, CapacityPredictor};
use crate::config::EngineConfig;
use crate::error::{AnalyticsError, Result};
use crate::kpi::{KpiCollector, KpiSink};
use crate::patterns::WorkloadPatterns;
use chrono::{DateTime, Utc};
use pulse_bottleneck::{BottleneckDetectorSet, BottleneckRecord};
use pulse_cache::{get_or_try_insert, CacheStats, SnapshotCache, TtlCache};
use pulse_facts::{
    Clock, DateRange, FactQuery, FactSource, Granularity, Metric, SourceError, SystemClock, TicketFact,
    TimeBasis, WorkforceProvider,
};
use pulse_series::stats::{mean, variance};
use pulse_series::{ForecastPoint, TrendResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Longest forecast horizon, in days, a capacity prediction will request
const MAX_CAPACITY_HORIZON_DAYS: i64 = 366;

/// Forecast of `trend`, for callers that cannot work without one
///
/// # Errors
/// - `AnalyticsError::InsufficientData` when the history was too short to
///   forecast
pub fn require_forecast(trend: &TrendResult) -> Result<&[ForecastPoint]> {
    trend.forecast.as_deref().ok_or_else(|| {
        AnalyticsError::InsufficientData(format!(
            "{} over {} has {} samples, too few to forecast",
            trend.metric,
            trend.period,
            trend.samples.len()
        ))
    })
}

/// Composed dashboard for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub period: DateRange,
    pub generated_at: DateTime<Utc>,
    pub statistics: PeriodStatistics,
    pub volume_trend: TrendResult,
    pub bottlenecks: Vec<BottleneckRecord>,
    pub patterns: WorkloadPatterns,
    /// Sub-computations that fell back to defaults
    pub degraded: Vec<String>,
}

/// Per-technician performance row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPerformance {
    pub technician_id: String,
    pub assigned: usize,
    pub resolved: usize,
    pub avg_resolution_min: f64,
    /// Percent
    pub sla_compliance_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_satisfaction: Option<f64>,
    /// Percent of the team's assigned tickets
    pub share_of_volume_pct: f64,
}

/// Team-wide totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub assigned: usize,
    pub resolved: usize,
    pub avg_resolution_min: f64,
    pub sla_compliance_rate: f64,
}

/// Performance of a team, or of every assigned technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub period: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub members: Vec<MemberPerformance>,
    pub totals: TeamTotals,
    pub generated_at: DateTime<Utc>,
}

/// Builder for [`AnalyticsEngine`]
#[derive(Debug)]
pub struct AnalyticsEngineBuilder {
    facts: Arc<dyn FactSource>,
    workforce: Arc<dyn WorkforceProvider>,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<Arc<dyn SnapshotCache<DashboardSnapshot>>>,
    detectors: Option<BottleneckDetectorSet>,
}

impl AnalyticsEngineBuilder {
    /// With configuration
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With clock; also drives the default cache's expiry
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// With dashboard cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn SnapshotCache<DashboardSnapshot>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// With custom detector tables
    #[must_use]
    pub fn detectors(mut self, detectors: BottleneckDetectorSet) -> Self {
        self.detectors = Some(detectors);
        self
    }

    /// Validate configuration and build
    ///
    /// # Errors
    /// - `AnalyticsError::Config` if the configuration is invalid
    pub fn build(self) -> Result<AnalyticsEngine> {
        self.config.validate()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(TtlCache::with_clock(clock.clone())));
        let timeout = self.config.query_timeout();
        Ok(AnalyticsEngine {
            aggregator: MetricsAggregator::new(self.facts.clone(), self.workforce.clone(), timeout),
            detectors: self
                .detectors
                .unwrap_or_default()
                .with_timeout(timeout),
            capacity: CapacityPredictor::new(self.config.work_calendar),
            facts: self.facts,
            workforce: self.workforce,
            config: self.config,
            clock,
            cache,
        })
    }
}

/// Predictive operations analytics over a fact source
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    facts: Arc<dyn FactSource>,
    workforce: Arc<dyn WorkforceProvider>,
    aggregator: MetricsAggregator,
    detectors: BottleneckDetectorSet,
    capacity: CapacityPredictor,
    cache: Arc<dyn SnapshotCache<DashboardSnapshot>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl AnalyticsEngine {
    /// Start building an engine over the given providers
    #[must_use]
    pub fn builder(facts: Arc<dyn FactSource>, workforce: Arc<dyn WorkforceProvider>) -> AnalyticsEngineBuilder {
        AnalyticsEngineBuilder {
            facts,
            workforce,
            config: EngineConfig::default(),
            clock: None,
            cache: None,
            detectors: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn aggregator(&self) -> &MetricsAggregator {
        &self.aggregator
    }

    /// Dashboard cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// KPI job over the default dashboard window
    #[must_use]
    pub fn kpi_collector(&self, sink: Arc<dyn KpiSink>) -> KpiCollector {
        KpiCollector::new(
            self.aggregator.clone(),
            sink,
            self.clock.clone(),
            self.config.default_period_days,
        )
    }

    /// Dashboard snapshot for `period`, or the default trailing window
    ///
    /// Served from cache while the entry for the period's key is live. The
    /// default window is anchored to the current hour so repeated calls
    /// share a key.
    ///
    /// # Errors
    /// Only on cache-independent failures; sub-computations degrade instead.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard_metrics(&self, period: Option<DateRange>) -> Result<DashboardSnapshot> {
        let period = period
            .unwrap_or_else(|| DateRange::hour_aligned_trailing(self.clock.now(), self.config.default_period_days))
            .normalized();
        let key = period.cache_key();
        tracing::info!("dashboard metrics for {}", key);
        get_or_try_insert(self.cache.as_ref(), &key, self.config.cache_ttl(), || {
            self.compose_dashboard(period)
        })
        .await
    }

    async fn compose_dashboard(&self, period: DateRange) -> Result<DashboardSnapshot> {
        let generated_at = self.clock.now();
        let patterns_query = FactQuery::new(period).labelled("dashboard.patterns");
        let (report, trend, detection, patterns) = tokio::join!(
            self.aggregator.aggregate(period, None),
            self.trend_analysis(Metric::TicketVolume, period, Granularity::Daily),
            self.detectors.detect(self.facts.as_ref(), period, generated_at),
            self.bounded(
                "dashboard patterns query",
                self.facts.query_ticket_facts(&patterns_query),
            ),
        );

        let mut degraded = report.degraded;
        let volume_trend = trend.unwrap_or_else(|e| {
            tracing::warn!("volume trend fell back to empty: {}", e);
            degraded.push("volume_trend".to_string());
            TrendResult::empty(Metric::TicketVolume, period, Granularity::Daily)
        });
        let patterns = match patterns {
            Ok(facts) => WorkloadPatterns::analyze(&facts),
            Err(e) => {
                tracing::warn!("workload patterns fell back to empty: {}", e);
                degraded.push("patterns".to_string());
                WorkloadPatterns::default()
            }
        };
        degraded.extend(detection.failed.iter().map(|d| format!("bottlenecks.{d}")));

        Ok(DashboardSnapshot {
            period,
            generated_at,
            statistics: report.statistics,
            volume_trend,
            bottlenecks: detection.records,
            patterns,
            degraded,
        })
    }

    /// Per-technician performance for a team, or for everyone assigned work
    ///
    /// # Errors
    /// - `UpstreamUnavailable` / `Timeout` when membership or facts cannot be read
    #[tracing::instrument(skip(self))]
    pub async fn team_performance(&self, period: DateRange, team_id: Option<&str>) -> Result<TeamSnapshot> {
        tracing::info!("team performance for {} ({})", period, team_id.unwrap_or("all"));
        let mut query = FactQuery::new(period).assigned_only().labelled("team.performance");
        let mut members: Vec<String> = Vec::new();
        if let Some(team) = team_id {
            members = self.bounded("team membership", self.workforce.team_members(team)).await?;
            query = query.for_technicians(members.iter().cloned());
        }
        let facts = self.bounded("team facts query", self.facts.query_ticket_facts(&query)).await?;

        let mut by_tech: BTreeMap<&str, Vec<&TicketFact>> =
            members.iter().map(|m| (m.as_str(), Vec::new())).collect();
        for fact in &facts {
            if let Some(tech) = fact.technician_id.as_deref() {
                by_tech.entry(tech).or_default().push(fact);
            }
        }

        let all: Vec<&TicketFact> = facts.iter().collect();
        let totals = TeamTotals {
            assigned: all.len(),
            resolved: all.iter().filter(|f| f.status.is_resolved()).count(),
            avg_resolution_min: Metric::ResolutionTime.evaluate(&all),
            sla_compliance_rate: Metric::SlaCompliance.evaluate(&all),
        };
        #[allow(clippy::cast_precision_loss)]
        let members = by_tech
            .into_iter()
            .map(|(tech, tickets)| MemberPerformance {
                technician_id: tech.to_string(),
                assigned: tickets.len(),
                resolved: tickets.iter().filter(|f| f.status.is_resolved()).count(),
                avg_resolution_min: Metric::ResolutionTime.evaluate(&tickets),
                sla_compliance_rate: Metric::SlaCompliance.evaluate(&tickets),
                avg_satisfaction: tickets
                    .iter()
                    .any(|f| f.satisfaction_score.is_some())
                    .then(|| Metric::Satisfaction.evaluate(&tickets)),
                share_of_volume_pct: if totals.assigned == 0 {
                    0.0
                } else {
                    tickets.len() as f64 * 100.0 / totals.assigned as f64
                },
            })
            .collect();

        Ok(TeamSnapshot {
            period,
            team_id: team_id.map(str::to_string),
            members,
            totals,
            generated_at: self.clock.now(),
        })
    }

    /// Trend, seasonality and forecast for `metric`
    ///
    /// # Errors
    /// - `UpstreamUnavailable` / `Timeout` when the series cannot be fetched
    #[tracing::instrument(skip(self))]
    pub async fn trend_analysis(
        &self,
        metric: Metric,
        period: DateRange,
        granularity: Granularity,
    ) -> Result<TrendResult> {
        tracing::info!("trend analysis of {} over {} by {}", metric, period, granularity.as_str());
        let samples = self.aggregator.series(metric, period, granularity, None).await?;
        let result = TrendResult::build(metric, period, granularity, samples, self.config.forecast_horizon)?;
        tracing::debug!(
            "{}: {:?} ({:+.1}%), seasonal: {}",
            metric,
            result.direction,
            result.percentage_change,
            result.seasonality.is_some()
        );
        Ok(result)
    }

    /// [`AnalyticsEngine::trend_analysis`] from unparsed request values
    ///
    /// # Errors
    /// - `UnsupportedMetric` for an unknown metric name
    /// - `InvalidRange` for `start > end` or an unknown granularity
    /// - otherwise as [`AnalyticsEngine::trend_analysis`]
    pub async fn trend_analysis_named(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: &str,
    ) -> Result<TrendResult> {
        let metric: Metric = metric.parse()?;
        let period = DateRange::new(start, end)?;
        let granularity: Granularity = granularity.parse()?;
        self.trend_analysis(metric, period, granularity).await
    }

    /// Bottlenecks across every dimension, most urgent first
    ///
    /// A dimension whose query fails contributes no records.
    ///
    /// # Errors
    /// Never fails today; kept fallible for parity with the other operations.
    #[tracing::instrument(skip(self))]
    pub async fn detect_bottlenecks(&self, period: DateRange) -> Result<Vec<BottleneckRecord>> {
        tracing::info!("detecting bottlenecks over {}", period);
        let report = self
            .detectors
            .detect(self.facts.as_ref(), period, self.clock.now())
            .await;
        if !report.failed.is_empty() {
            tracing::warn!("bottleneck dimensions unavailable: {:?}", report.failed);
        }
        Ok(report.records)
    }

    /// Staffing forecast for `future`
    ///
    /// History is the configured trend window of whole days before today.
    ///
    /// # Errors
    /// - `UpstreamUnavailable` / `Timeout` when volume, resolution history or
    ///   workforce data cannot be read
    #[tracing::instrument(skip(self))]
    pub async fn capacity_prediction(&self, future: DateRange) -> Result<CapacityForecast> {
        let now = self.clock.now();
        tracing::info!("capacity prediction for {}", future);
        let history = DateRange::trailing_days(Granularity::Daily.bucket_start(now), self.config.trend_window_days);
        let horizon = u32::try_from(
            (future.end() - history.end())
                .num_days()
                .clamp(1, MAX_CAPACITY_HORIZON_DAYS),
        )
        .unwrap_or(1);

        let resolved_query = FactQuery::new(history)
            .with_basis(TimeBasis::Resolved)
            .labelled("capacity.resolution");
        let (samples, resolved, workforce) = futures::try_join!(
            self.aggregator
                .series(Metric::TicketVolume, history, Granularity::Daily, None),
            self.bounded(
                "capacity resolution query",
                self.facts.query_ticket_facts(&resolved_query)
            ),
            self.bounded("workforce capacity", self.workforce.get_capacity(&future)),
        )?;

        let volume = TrendResult::build(Metric::TicketVolume, history, Granularity::Daily, samples, horizon)?;
        let hours: Vec<f64> = resolved
            .iter()
            .filter_map(|f| f.resolution_time_min)
            .map(|m| m / 60.0)
            .collect();
        let inputs = CapacityInputs {
            period: future,
            volume: &volume,
            workforce,
            avg_resolution_hours: mean(&hours),
            resolution_variance: variance(&hours),
            historical_samples: hours.len(),
        };
        Ok(self.capacity.predict(&inputs, now))
    }

    /// Drop every cached dashboard
    pub async fn invalidate_dashboards(&self) {
        self.cache.invalidate_all().await;
    }

    /// Await an upstream call under the configured timeout
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, SourceError>>,
    {
        let timeout = self.config.query_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AnalyticsError::timeout(operation, timeout)),
        }
    }
}
