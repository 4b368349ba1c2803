//! Period statistics and bucketed series over the fact source
//!
//! Statistics are split into independent groups, each backed by its own
//! query. Groups run concurrently under the configured timeout; a group that
//! fails falls back to zeros and is reported in the degraded list instead of
//! failing the whole aggregate.

use crate::error::{AnalyticsError, Result};
use chrono::{DateTime, Duration as Span, Utc};
use pulse_facts::{
    DateRange, FactQuery, FactSource, Granularity, Metric, SourceError, TicketFact, TimeBasis,
    WorkforceProvider,
};
use pulse_series::trend::percentage_change;
use pulse_series::MetricSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Ticket counts by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub resolved_tickets: usize,
}

/// Outcome measures over tickets resolved in the period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub avg_resolution_min: f64,
    /// Percent
    pub sla_compliance_rate: f64,
    /// 1–5, 0 without survey answers
    pub satisfaction_score: f64,
}

/// Activity at the tail of the period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeCounts {
    /// Created in the last 24 hours of the period
    pub created_last_24h: usize,
    /// Still open and not assigned to anyone, among tickets created in the
    /// period; older unassigned backlog is not counted
    pub unassigned_open: usize,
}

/// Percentage change against the previous period of equal length
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendDeltas {
    pub ticket_volume_pct: f64,
    pub resolution_time_pct: f64,
    pub sla_compliance_pct: f64,
}

/// Headline statistics for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStatistics {
    #[serde(flatten)]
    pub volume: VolumeStats,
    pub avg_response_min: f64,
    #[serde(flatten)]
    pub resolution: ResolutionStats,
    /// Percent
    pub utilization_rate: f64,
    pub realtime: RealtimeCounts,
    pub deltas: TrendDeltas,
}

/// Statistics plus the groups that fell back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub statistics: PeriodStatistics,
    pub degraded: Vec<String>,
}

/// Optional narrowing applied to every statistic query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsFilter {
    pub technicians: Vec<String>,
    pub category: Option<String>,
    pub customer: Option<String>,
}

impl StatisticsFilter {
    #[must_use]
    pub fn for_technicians<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            technicians: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn apply(&self, mut query: FactQuery) -> FactQuery {
        if !self.technicians.is_empty() {
            query = query.for_technicians(self.technicians.iter().cloned());
        }
        if let Some(category) = &self.category {
            query = query.in_category(category.clone());
        }
        if let Some(customer) = &self.customer {
            query = query.for_customer(customer.clone());
        }
        query
    }
}

/// Issues statistic queries against the upstream providers
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    facts: Arc<dyn FactSource>,
    workforce: Arc<dyn WorkforceProvider>,
    timeout: Duration,
}

impl MetricsAggregator {
    /// Create new aggregator
    #[must_use]
    pub fn new(facts: Arc<dyn FactSource>, workforce: Arc<dyn WorkforceProvider>, timeout: Duration) -> Self {
        Self {
            facts,
            workforce,
            timeout,
        }
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Compute headline statistics for `period`
    ///
    /// Never fails; unavailable groups are zeroed and named in
    /// [`AggregateReport::degraded`].
    #[allow(clippy::cast_precision_loss)]
    pub async fn aggregate(&self, period: DateRange, filter: Option<&StatisticsFilter>) -> AggregateReport {
        let scope = |query: FactQuery| match filter {
            Some(f) => f.apply(query),
            None => query,
        };
        let created = scope(FactQuery::new(period).labelled("stats.created"));
        let resolved = scope(
            FactQuery::new(period)
                .with_basis(TimeBasis::Resolved)
                .labelled("stats.resolved"),
        );
        let tail = scope(FactQuery::new(last_day(&period)).labelled("stats.realtime"));
        let prev_created = scope(FactQuery::new(period.previous()).labelled("stats.previous_created"));
        let prev_resolved = scope(
            FactQuery::new(period.previous())
                .with_basis(TimeBasis::Resolved)
                .labelled("stats.previous_resolved"),
        );

        let (volume, response, resolution, utilization, realtime, previous) = tokio::join!(
            self.guarded("volume", async {
                let facts = self.facts.query_ticket_facts(&created).await?;
                Ok::<_, SourceError>(volume_of(&facts))
            }),
            self.guarded("response_time", async {
                let facts = self.facts.query_ticket_facts(&created).await?;
                Ok::<_, SourceError>(evaluate(Metric::ResponseTime, &facts))
            }),
            self.guarded("resolution", async {
                let facts = self.facts.query_ticket_facts(&resolved).await?;
                Ok::<_, SourceError>(resolution_of(&facts))
            }),
            self.guarded("utilization", async {
                Ok::<_, SourceError>(self.workforce.get_capacity(&period).await?.avg_utilization)
            }),
            self.guarded("realtime", async {
                let (recent, open) = futures::try_join!(
                    self.facts.query_ticket_facts(&tail),
                    self.facts.query_ticket_facts(&created),
                )?;
                Ok::<_, SourceError>(RealtimeCounts {
                    created_last_24h: recent.len(),
                    unassigned_open: open
                        .iter()
                        .filter(|f| f.status.is_open() && f.technician_id.is_none())
                        .count(),
                })
            }),
            self.guarded("trend_deltas", async {
                let (created, resolved) = futures::try_join!(
                    self.facts.query_ticket_facts(&prev_created),
                    self.facts.query_ticket_facts(&prev_resolved),
                )?;
                Ok::<_, SourceError>((volume_of(&created), resolution_of(&resolved)))
            }),
        );

        let mut degraded = Vec::new();
        let mut fallback = |group: &'static str| {
            degraded.push(group.to_string());
        };

        let deltas = match (&volume, &resolution, &previous) {
            (Ok(volume), Ok(resolution), Ok((prev_volume, prev_resolution))) => TrendDeltas {
                ticket_volume_pct: percentage_change(
                    prev_volume.total_tickets as f64,
                    volume.total_tickets as f64,
                ),
                resolution_time_pct: percentage_change(
                    prev_resolution.avg_resolution_min,
                    resolution.avg_resolution_min,
                ),
                sla_compliance_pct: percentage_change(
                    prev_resolution.sla_compliance_rate,
                    resolution.sla_compliance_rate,
                ),
            },
            (_, _, Err(group)) => {
                fallback(*group);
                TrendDeltas::default()
            }
            // deltas need both sides of the comparison
            _ => {
                fallback("trend_deltas");
                TrendDeltas::default()
            }
        };

        let statistics = PeriodStatistics {
            volume: volume.unwrap_or_else(|g| {
                fallback(g);
                VolumeStats::default()
            }),
            avg_response_min: response.unwrap_or_else(|g| {
                fallback(g);
                0.0
            }),
            resolution: resolution.unwrap_or_else(|g| {
                fallback(g);
                ResolutionStats::default()
            }),
            utilization_rate: utilization.unwrap_or_else(|g| {
                fallback(g);
                0.0
            }),
            realtime: realtime.unwrap_or_else(|g| {
                fallback(g);
                RealtimeCounts::default()
            }),
            deltas,
        };
        degraded.sort();
        tracing::debug!("aggregated {}: {} groups degraded", period, degraded.len());
        AggregateReport { statistics, degraded }
    }

    /// Gap-free series of `metric` over `period`
    ///
    /// One sample per bucket, zero where nothing happened. Tickets are placed
    /// by the metric's own time basis.
    ///
    /// # Errors
    /// - `AnalyticsError::UpstreamUnavailable` / `Timeout` when the query fails
    pub async fn series(
        &self,
        metric: Metric,
        period: DateRange,
        granularity: Granularity,
        filter: Option<&StatisticsFilter>,
    ) -> Result<Vec<MetricSample>> {
        let mut query = FactQuery::new(period)
            .with_basis(metric.time_basis())
            .labelled(format!("series.{}", metric.name()));
        if let Some(f) = filter {
            query = f.apply(query);
        }
        let facts = tokio::time::timeout(self.timeout, self.facts.query_ticket_facts(&query))
            .await
            .map_err(|_| AnalyticsError::timeout(format!("{} series query", metric.name()), self.timeout))??;
        Ok(bucketize(metric, granularity, &period, &facts))
    }

    async fn guarded<T, F>(&self, group: &'static str, work: F) -> std::result::Result<T, &'static str>
    where
        F: Future<Output = std::result::Result<T, SourceError>>,
    {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("statistic group '{}' fell back to defaults: {}", group, e);
                Err(group)
            }
            Err(_) => {
                tracing::warn!(
                    "statistic group '{}' timed out after {:?}, using defaults",
                    group,
                    self.timeout
                );
                Err(group)
            }
        }
    }
}

/// Group facts into the buckets of `period` and evaluate `metric` per bucket
#[must_use]
pub fn bucketize(
    metric: Metric,
    granularity: Granularity,
    period: &DateRange,
    facts: &[TicketFact],
) -> Vec<MetricSample> {
    let mut grouped: BTreeMap<DateTime<Utc>, Vec<&TicketFact>> = BTreeMap::new();
    for fact in facts {
        let at = match metric.time_basis() {
            TimeBasis::Created => Some(fact.created_at),
            TimeBasis::Resolved => fact.resolved_at,
        };
        if let Some(at) = at {
            grouped.entry(granularity.bucket_start(at)).or_default().push(fact);
        }
    }
    granularity
        .buckets(period)
        .into_iter()
        .map(|bucket| {
            let group = grouped.get(&bucket).map_or(&[][..], Vec::as_slice);
            MetricSample::new(bucket, metric.evaluate(group))
        })
        .collect()
}

fn evaluate(metric: Metric, facts: &[TicketFact]) -> f64 {
    let refs: Vec<&TicketFact> = facts.iter().collect();
    metric.evaluate(&refs)
}

fn volume_of(facts: &[TicketFact]) -> VolumeStats {
    VolumeStats {
        total_tickets: facts.len(),
        open_tickets: facts.iter().filter(|f| f.status.is_open()).count(),
        resolved_tickets: facts.iter().filter(|f| f.status.is_resolved()).count(),
    }
}

fn resolution_of(facts: &[TicketFact]) -> ResolutionStats {
    ResolutionStats {
        avg_resolution_min: evaluate(Metric::ResolutionTime, facts),
        sla_compliance_rate: evaluate(Metric::SlaCompliance, facts),
        satisfaction_score: evaluate(Metric::Satisfaction, facts),
    }
}

/// Trailing 24 hours of `period`, or the whole period when shorter
fn last_day(period: &DateRange) -> DateRange {
    let start = (period.end() - Span::hours(24)).max(period.start());
    DateRange::new(start, period.end()).unwrap_or(*period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pulse_facts::{MemoryFactSource, StaticWorkforce, WorkforceCapacity};

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl FactSource for Broken {
        async fn query_ticket_facts(&self, _q: &FactQuery) -> std::result::Result<Vec<TicketFact>, SourceError> {
            Err(SourceError::unavailable("warehouse offline"))
        }
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, d, h, 0, 0).unwrap()
    }

    fn period() -> DateRange {
        DateRange::new(day(8, 0), day(15, 0)).unwrap()
    }

    fn facts() -> Vec<TicketFact> {
        vec![
            // previous week
            TicketFact::new("P-1", "email", "acme", day(2, 9)).resolved_after(60.0, true),
            TicketFact::new("P-2", "email", "acme", day(3, 9)).resolved_after(60.0, false),
            // current week
            TicketFact::new("C-1", "email", "acme", day(8, 9))
                .assigned_to("ana")
                .responded_after(20.0)
                .resolved_after(120.0, true)
                .rated(5.0),
            TicketFact::new("C-2", "network", "acme", day(9, 9))
                .assigned_to("bo")
                .responded_after(40.0)
                .resolved_after(240.0, true)
                .rated(3.0),
            TicketFact::new("C-3", "network", "globex", day(12, 9)).assigned_to("bo"),
            TicketFact::new("C-4", "email", "globex", day(14, 10)),
        ]
    }

    fn aggregator(source: Arc<dyn FactSource>) -> MetricsAggregator {
        let workforce = Arc::new(StaticWorkforce::new(WorkforceCapacity::new(3, 72.5)));
        MetricsAggregator::new(source, workforce, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn aggregate_counts_and_rates() {
        let agg = aggregator(Arc::new(MemoryFactSource::new(facts())));
        let report = agg.aggregate(period(), None).await;
        let stats = report.statistics;

        assert!(report.degraded.is_empty());
        assert_eq!(stats.volume.total_tickets, 4);
        assert_eq!(stats.volume.open_tickets, 2);
        assert_eq!(stats.volume.resolved_tickets, 2);
        assert!((stats.avg_response_min - 30.0).abs() < 1e-9);
        assert!((stats.resolution.avg_resolution_min - 180.0).abs() < 1e-9);
        assert!((stats.resolution.sla_compliance_rate - 100.0).abs() < 1e-9);
        assert!((stats.resolution.satisfaction_score - 4.0).abs() < 1e-9);
        assert!((stats.utilization_rate - 72.5).abs() < 1e-9);
        assert_eq!(stats.realtime.created_last_24h, 1);
        assert_eq!(stats.realtime.unassigned_open, 1);

        // 2 → 4 tickets, 60 → 180 minutes, 50% → 100% compliance
        assert!((stats.deltas.ticket_volume_pct - 100.0).abs() < 1e-9);
        assert!((stats.deltas.resolution_time_pct - 200.0).abs() < 1e-9);
        assert!((stats.deltas.sla_compliance_pct - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_source_degrades_every_fact_group() {
        let report = aggregator(Arc::new(Broken)).aggregate(period(), None).await;
        assert_eq!(report.statistics.volume, VolumeStats::default());
        assert!((report.statistics.utilization_rate - 72.5).abs() < 1e-9);
        assert_eq!(
            report.degraded,
            vec!["realtime", "resolution", "response_time", "trend_deltas", "volume"]
        );
    }

    #[tokio::test]
    async fn deltas_fall_back_when_current_side_is_missing() {
        let source = pulse_test_utils::FailingSource::new(facts()).failing_on("stats.resolved");
        let report = aggregator(Arc::new(source)).aggregate(period(), None).await;
        assert_eq!(report.degraded, vec!["resolution", "trend_deltas"]);
        assert_eq!(report.statistics.volume.total_tickets, 4);
        assert_eq!(report.statistics.deltas, TrendDeltas::default());
    }

    #[tokio::test]
    async fn unassigned_count_covers_tickets_created_in_period() {
        let mut facts = facts();
        facts.push(TicketFact::new("OLD-1", "email", "acme", day(5, 9)));
        let report = aggregator(Arc::new(MemoryFactSource::new(facts)))
            .aggregate(period(), None)
            .await;
        assert_eq!(report.statistics.realtime.unassigned_open, 1);
    }

    #[tokio::test]
    async fn filter_narrows_statistics() {
        let agg = aggregator(Arc::new(MemoryFactSource::new(facts())));
        let report = agg
            .aggregate(period(), Some(&StatisticsFilter::for_technicians(["bo"])))
            .await;
        assert_eq!(report.statistics.volume.total_tickets, 2);
        assert_eq!(report.statistics.realtime.unassigned_open, 0);
    }

    #[tokio::test]
    async fn series_is_gap_free() {
        let agg = aggregator(Arc::new(MemoryFactSource::new(facts())));
        let samples = agg
            .series(Metric::TicketVolume, period(), Granularity::Daily, None)
            .await
            .unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(samples[0].date, day(8, 0));
    }

    #[tokio::test]
    async fn series_failure_is_an_error() {
        let err = aggregator(Arc::new(Broken))
            .series(Metric::TicketVolume, period(), Granularity::Daily, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamUnavailable(_)));
    }

    #[test]
    fn resolved_metrics_bucket_by_resolution() {
        let facts = vec![TicketFact::new("x", "email", "acme", day(8, 23)).resolved_after(120.0, true)];
        let samples = bucketize(Metric::ResolvedVolume, Granularity::Daily, &period(), &facts);
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].value, 1.0);
    }
}
