//! Bottleneck records and their classification enums

use chrono::{DateTime, Utc};
use pulse_facts::{DateRange, FactQuery};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// What kind of entity a record is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Technician,
    Category,
    Customer,
    Process,
}

impl Dimension {
    /// Every dimension, in detection order
    pub const ALL: [Dimension; 4] = [Self::Technician, Self::Category, Self::Customer, Self::Process];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technician => "technician",
            Self::Category => "category",
            Self::Customer => "customer",
            Self::Process => "process",
        }
    }

    /// Label attached to this dimension's upstream query
    #[must_use]
    pub fn query_label(self) -> String {
        format!("bottleneck.{}", self.as_str())
    }

    /// Facts a detector for this dimension needs
    #[must_use]
    pub fn fact_query(self, period: DateRange) -> FactQuery {
        let query = FactQuery::new(period).labelled(self.query_label());
        match self {
            Self::Technician => query.assigned_only(),
            Self::Category | Self::Customer | Self::Process => query,
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently a bottleneck needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Risk score contributed by the severity alone
    #[must_use]
    pub fn base_risk(self) -> f64 {
        match self {
            Self::Low => 10.0,
            Self::Medium => 30.0,
            Self::High => 50.0,
            Self::Critical => 70.0,
        }
    }
}

/// One flagged entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckRecord {
    pub dimension: Dimension,
    pub identifier: String,
    pub description: String,
    pub severity: Severity,
    /// Tickets affected by the condition
    pub affected_count: usize,
    /// Estimated delay caused, in hours
    pub delay_impact: f64,
    /// `0..=100`
    pub risk_score: f64,
    pub recommendations: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Order records most urgent first
///
/// Severity descending, then risk descending, then identifier for a stable
/// tie-break.
pub fn sort_by_urgency(records: &mut [BottleneckRecord]) {
    records.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.risk_score.total_cmp(&a.risk_score))
            .then_with(|| a.dimension.cmp(&b.dimension))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, severity: Severity, risk: f64) -> BottleneckRecord {
        BottleneckRecord {
            dimension: Dimension::Technician,
            identifier: id.to_string(),
            description: String::new(),
            severity,
            affected_count: 1,
            delay_impact: 0.0,
            risk_score: risk,
            recommendations: Vec::new(),
            detected_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn urgency_order() {
        let mut records = vec![
            record("a", Severity::Medium, 40.0),
            record("b", Severity::Critical, 75.0),
            record("c", Severity::Medium, 45.0),
            record("d", Severity::Critical, 90.0),
        ];
        sort_by_urgency(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn technician_query_requires_assignment() {
        let period = DateRange::trailing_days(Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap(), 30);
        let query = Dimension::Technician.fact_query(period);
        assert_eq!(query.label(), "bottleneck.technician");
        let fact = pulse_facts::TicketFact::new("t", "c", "x", period.start());
        assert!(!query.matches(&fact));
        assert!(Dimension::Category.fact_query(period).matches(&fact));
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert!(Severity::Critical > Severity::High);
    }
}
