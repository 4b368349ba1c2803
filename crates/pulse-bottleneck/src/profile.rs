//! Per-entity metric extraction

use pulse_facts::{Priority, TicketFact};
use pulse_series::stats::mean;
use std::collections::BTreeMap;

/// Metrics for one entity over the period
#[derive(Debug, Clone, PartialEq)]
pub struct EntityProfile {
    pub identifier: String,
    pub tickets: usize,
    pub sla_evaluated: usize,
    pub sla_breached: usize,
    pub critical: usize,
    /// Minutes; `None` when no ticket was resolved
    pub avg_resolution_min: Option<f64>,
    /// 1–5; `None` without survey answers
    pub avg_satisfaction: Option<f64>,
    resolution_times: Vec<f64>,
}

impl EntityProfile {
    /// Build a profile from the entity's tickets
    #[must_use]
    pub fn from_facts(identifier: impl Into<String>, facts: &[&TicketFact]) -> Self {
        let resolution_times: Vec<f64> = facts.iter().filter_map(|f| f.resolution_time_min).collect();
        let scores: Vec<f64> = facts.iter().filter_map(|f| f.satisfaction_score).collect();
        Self {
            identifier: identifier.into(),
            tickets: facts.len(),
            sla_evaluated: facts.iter().filter(|f| f.sla_met.is_some()).count(),
            sla_breached: facts.iter().filter(|f| f.sla_breached()).count(),
            critical: facts.iter().filter(|f| f.priority == Priority::Critical).count(),
            avg_resolution_min: (!resolution_times.is_empty()).then(|| mean(&resolution_times)),
            avg_satisfaction: (!scores.is_empty()).then(|| mean(&scores)),
            resolution_times,
        }
    }

    /// Share of SLA-evaluated tickets that breached, in `[0, 1]`
    #[must_use]
    pub fn breach_rate(&self) -> f64 {
        ratio(self.sla_breached, self.sla_evaluated)
    }

    /// Share of tickets at critical priority, in `[0, 1]`
    #[must_use]
    pub fn critical_share(&self) -> f64 {
        ratio(self.critical, self.tickets)
    }

    /// Hours spent beyond `baseline_min` across this entity's resolutions
    #[must_use]
    pub fn excess_hours(&self, baseline_min: f64) -> f64 {
        self.resolution_times
            .iter()
            .map(|t| (t - baseline_min).max(0.0))
            .sum::<f64>()
            / 60.0
    }
}

/// Population baseline every entity is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cohort {
    pub tickets: usize,
    pub avg_resolution_min: f64,
    pub breach_rate: f64,
}

impl Cohort {
    /// Baseline over every fact in the period
    #[must_use]
    pub fn from_facts(facts: &[TicketFact]) -> Self {
        let all: Vec<&TicketFact> = facts.iter().collect();
        let overall = EntityProfile::from_facts("*", &all);
        Self {
            tickets: overall.tickets,
            avg_resolution_min: overall.avg_resolution_min.unwrap_or(0.0),
            breach_rate: overall.breach_rate(),
        }
    }
}

/// Group facts by `key` and profile each group
///
/// Facts whose key is `None` are skipped. Output is ordered by identifier.
#[must_use]
pub fn profile_by<'a, F>(facts: &'a [TicketFact], key: F) -> Vec<EntityProfile>
where
    F: Fn(&'a TicketFact) -> Option<&'a str>,
{
    let mut groups: BTreeMap<&str, Vec<&TicketFact>> = BTreeMap::new();
    for fact in facts {
        if let Some(k) = key(fact) {
            groups.entry(k).or_default().push(fact);
        }
    }
    groups
        .into_iter()
        .map(|(id, group)| EntityProfile::from_facts(id, &group))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
