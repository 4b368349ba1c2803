//! Named measures that can be bucketed into a time series

use crate::fact::TicketFact;
use crate::query::TimeBasis;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Metric name not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported metric: '{0}'")]
pub struct UnsupportedMetric(pub String);

/// Measure derived from a group of ticket facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Tickets created
    TicketVolume,
    /// Tickets resolved
    ResolvedVolume,
    /// Average first response time (minutes)
    ResponseTime,
    /// Average resolution time (minutes)
    ResolutionTime,
    /// Share of SLA-evaluated tickets that met the SLA (percent)
    SlaCompliance,
    /// Average satisfaction score (1–5)
    Satisfaction,
    /// Share of tickets escalated (percent)
    EscalationRate,
    /// Share of resolved tickets reopened at least once (percent)
    ReopenRate,
}

impl Metric {
    /// Every supported metric
    pub const ALL: [Metric; 8] = [
        Self::TicketVolume,
        Self::ResolvedVolume,
        Self::ResponseTime,
        Self::ResolutionTime,
        Self::SlaCompliance,
        Self::Satisfaction,
        Self::EscalationRate,
        Self::ReopenRate,
    ];

    /// Canonical snake_case name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TicketVolume => "ticket_volume",
            Self::ResolvedVolume => "resolved_volume",
            Self::ResponseTime => "response_time",
            Self::ResolutionTime => "resolution_time",
            Self::SlaCompliance => "sla_compliance",
            Self::Satisfaction => "satisfaction",
            Self::EscalationRate => "escalation_rate",
            Self::ReopenRate => "reopen_rate",
        }
    }

    /// Which timestamp places a ticket into a bucket for this metric
    #[must_use]
    pub fn time_basis(self) -> TimeBasis {
        match self {
            Self::TicketVolume | Self::ResponseTime | Self::EscalationRate => TimeBasis::Created,
            Self::ResolvedVolume
            | Self::ResolutionTime
            | Self::SlaCompliance
            | Self::Satisfaction
            | Self::ReopenRate => TimeBasis::Resolved,
        }
    }

    /// Whether a rising value is good news
    #[must_use]
    pub fn higher_is_better(self) -> bool {
        matches!(self, Self::ResolvedVolume | Self::SlaCompliance | Self::Satisfaction)
    }

    /// Evaluate the metric over the tickets that fall into one bucket
    ///
    /// Empty buckets, and buckets where no ticket carries the measured
    /// field, evaluate to `0.0`.
    #[must_use]
    pub fn evaluate(self, facts: &[&TicketFact]) -> f64 {
        match self {
            Self::TicketVolume | Self::ResolvedVolume => count(facts.len()),
            Self::ResponseTime => mean_of(facts.iter().filter_map(|f| f.response_time_min)),
            Self::ResolutionTime => mean_of(facts.iter().filter_map(|f| f.resolution_time_min)),
            Self::Satisfaction => mean_of(facts.iter().filter_map(|f| f.satisfaction_score)),
            Self::SlaCompliance => {
                let evaluated: Vec<bool> = facts.iter().filter_map(|f| f.sla_met).collect();
                percent(evaluated.iter().filter(|met| **met).count(), evaluated.len())
            }
            Self::EscalationRate => percent(facts.iter().filter(|f| f.escalated).count(), facts.len()),
            Self::ReopenRate => percent(
                facts.iter().filter(|f| f.reopened_count > 0).count(),
                facts.len(),
            ),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> f64 {
    n as f64
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / count(n)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        count(part) / count(whole) * 100.0
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = UnsupportedMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| UnsupportedMetric(s.to_string()))
    }
}
