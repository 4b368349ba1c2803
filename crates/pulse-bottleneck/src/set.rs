//! Concurrent detection across every dimension

use crate::detector::EntityAnomalyDetector;
use crate::record::{sort_by_urgency, BottleneckRecord, Dimension};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use pulse_facts::{DateRange, FactSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Records from one detection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Most urgent first
    pub records: Vec<BottleneckRecord>,
    /// Dimensions whose query failed or timed out
    pub failed: Vec<Dimension>,
}

/// Runs one detector per dimension, each against its own upstream query
#[derive(Debug, Clone)]
pub struct BottleneckDetectorSet {
    detectors: Vec<EntityAnomalyDetector>,
    timeout: Duration,
}

impl Default for BottleneckDetectorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl BottleneckDetectorSet {
    /// Create new set with default tables and a 5 second query timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            detectors: EntityAnomalyDetector::all().to_vec(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Bound each upstream query by `timeout`
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the detector for the same dimension
    #[must_use]
    pub fn with_detector(mut self, detector: EntityAnomalyDetector) -> Self {
        self.detectors.retain(|d| d.dimension() != detector.dimension());
        self.detectors.push(detector);
        self.detectors.sort_by_key(EntityAnomalyDetector::dimension);
        self
    }

    #[inline]
    #[must_use]
    pub fn detectors(&self) -> &[EntityAnomalyDetector] {
        &self.detectors
    }

    /// Detect bottlenecks over `period`
    ///
    /// A detector whose query fails yields no records and is listed in
    /// [`DetectionReport::failed`]; the others are unaffected.
    pub async fn detect(
        &self,
        source: &dyn FactSource,
        period: DateRange,
        detected_at: DateTime<Utc>,
    ) -> DetectionReport {
        let runs = self.detectors.iter().map(|detector| async move {
            let dimension = detector.dimension();
            let query = dimension.fact_query(period);
            match tokio::time::timeout(self.timeout, source.query_ticket_facts(&query)).await {
                Ok(Ok(facts)) => {
                    let records = detector.detect(&facts, detected_at);
                    tracing::debug!("{} detector: {} facts, {} records", dimension, facts.len(), records.len());
                    Ok(records)
                }
                Ok(Err(e)) => {
                    tracing::warn!("{} detector failed: {}", dimension, e);
                    Err(dimension)
                }
                Err(_) => {
                    tracing::warn!("{} detector timed out after {:?}", dimension, self.timeout);
                    Err(dimension)
                }
            }
        });

        let mut report = DetectionReport::default();
        for outcome in join_all(runs).await {
            match outcome {
                Ok(records) => report.records.extend(records),
                Err(dimension) => report.failed.push(dimension),
            }
        }
        sort_by_urgency(&mut report.records);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pulse_facts::{FactQuery, MemoryFactSource, SourceError, TicketFact};

    #[derive(Debug)]
    struct Flaky {
        inner: MemoryFactSource,
        broken: String,
    }

    #[async_trait]
    impl FactSource for Flaky {
        async fn query_ticket_facts(&self, query: &FactQuery) -> Result<Vec<TicketFact>, SourceError> {
            if query.label() == self.broken {
                return Err(SourceError::unavailable("replica down"));
            }
            self.inner.query_ticket_facts(query).await
        }
    }

    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl FactSource for Stalled {
        async fn query_ticket_facts(&self, _query: &FactQuery) -> Result<Vec<TicketFact>, SourceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn period() -> DateRange {
        DateRange::trailing_days(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(), 30)
    }

    fn facts() -> Vec<TicketFact> {
        let created = Utc.with_ymd_and_hms(2026, 3, 20, 10, 0, 0).unwrap();
        (0..30)
            .map(|i| {
                TicketFact::new(format!("T-{i}"), "desk", format!("c{}", i % 2), created)
                    .assigned_to("ana")
                    .responded_after(15.0)
                    .resolved_after(90.0, i % 3 != 0)
                    .rated(4.0)
            })
            .collect()
    }

    #[tokio::test]
    async fn failed_dimension_is_isolated() {
        let source = Flaky {
            inner: MemoryFactSource::new(facts()),
            broken: Dimension::Customer.query_label(),
        };
        let report = BottleneckDetectorSet::new().detect(&source, period(), period().end()).await;
        assert_eq!(report.failed, vec![Dimension::Customer]);
        assert!(report.records.iter().any(|r| r.dimension == Dimension::Technician));
        assert!(report.records.iter().all(|r| r.dimension != Dimension::Customer));
    }

    #[tokio::test]
    async fn records_are_sorted_by_urgency() {
        let source = MemoryFactSource::new(facts());
        let report = BottleneckDetectorSet::new().detect(&source, period(), period().end()).await;
        assert!(report.failed.is_empty());
        for pair in report.records.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
            if pair[0].severity == pair[1].severity {
                assert!(pair[0].risk_score >= pair[1].risk_score);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_source_times_out() {
        let set = BottleneckDetectorSet::new().with_timeout(Duration::from_millis(50));
        let report = set.detect(&Stalled, period(), period().end()).await;
        assert!(report.records.is_empty());
        assert_eq!(report.failed, Dimension::ALL.to_vec());
    }

    #[test]
    fn with_detector_replaces_same_dimension() {
        let set = BottleneckDetectorSet::new().with_detector(EntityAnomalyDetector::new(Dimension::Category));
        assert_eq!(set.detectors().len(), 4);
    }
}
