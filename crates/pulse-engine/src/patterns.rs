//! When tickets arrive and how each priority fares

use chrono::{Datelike, Timelike, Weekday};
use pulse_facts::{Priority, TicketFact};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hours counted as business hours, UTC
const BUSINESS_HOURS: std::ops::RangeInclusive<usize> = 9..=17;
/// Compliance below this percentage produces a warning
const SLA_TARGET_PCT: f64 = 90.0;
/// Resolved tickets a technician needs before being ranked
const MIN_RANKED_RESOLUTIONS: usize = 3;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Temporal and priority patterns over a set of tickets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPatterns {
    /// Tickets created per hour of day, index 0 = 00:00 UTC
    pub hourly: Vec<usize>,
    /// Tickets created per weekday, index 0 = Monday
    pub weekday: Vec<usize>,
    pub peak_hour: Option<u32>,
    pub peak_weekday: Option<Weekday>,
    /// Percent of tickets created 09:00–17:59 UTC
    pub business_hours_pct: f64,
    pub priority_distribution: BTreeMap<Priority, usize>,
    /// Percent per priority, resolved or closed tickets only
    pub sla_compliance_by_priority: BTreeMap<Priority, f64>,
    pub escalations_by_priority: BTreeMap<Priority, usize>,
    /// Mean of the per-priority compliance rates
    pub overall_sla_compliance: f64,
    /// Technician with the lowest mean resolution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_technician: Option<String>,
    pub insights: Vec<String>,
}

impl WorkloadPatterns {
    /// Analyze `facts`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn analyze(facts: &[TicketFact]) -> Self {
        let mut hourly = vec![0usize; 24];
        let mut weekday = vec![0usize; 7];
        let mut priority_distribution = BTreeMap::new();
        let mut escalations_by_priority = BTreeMap::new();
        let mut sla: BTreeMap<Priority, (usize, usize)> = BTreeMap::new();
        let mut by_tech: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

        for fact in facts {
            hourly[fact.created_at.hour() as usize] += 1;
            weekday[fact.created_at.weekday().num_days_from_monday() as usize] += 1;
            *priority_distribution.entry(fact.priority).or_insert(0) += 1;
            if fact.escalated {
                *escalations_by_priority.entry(fact.priority).or_insert(0) += 1;
            }
            if fact.status.is_resolved() {
                // missing SLA flags on closed tickets count as met
                let (met, total) = sla.entry(fact.priority).or_insert((0, 0));
                *total += 1;
                if fact.sla_met.unwrap_or(true) {
                    *met += 1;
                }
                if let (Some(tech), Some(minutes)) = (fact.technician_id.as_deref(), fact.resolution_time_min) {
                    by_tech.entry(tech).or_default().push(minutes);
                }
            }
        }

        let sla_compliance_by_priority: BTreeMap<Priority, f64> = sla
            .into_iter()
            .map(|(p, (met, total))| (p, met as f64 * 100.0 / total as f64))
            .collect();
        let overall_sla_compliance = if sla_compliance_by_priority.is_empty() {
            0.0
        } else {
            sla_compliance_by_priority.values().sum::<f64>() / sla_compliance_by_priority.len() as f64
        };

        let total = facts.len();
        let business: usize = hourly[BUSINESS_HOURS].iter().sum();
        let business_hours_pct = if total == 0 {
            0.0
        } else {
            business as f64 * 100.0 / total as f64
        };

        #[allow(clippy::cast_possible_truncation)]
        let peak_hour = peak(&hourly).map(|h| h as u32);
        let peak_weekday = peak(&weekday).map(|d| WEEKDAYS[d]);

        let fastest_technician = by_tech
            .into_iter()
            .filter(|(_, times)| times.len() >= MIN_RANKED_RESOLUTIONS)
            .map(|(tech, times)| (tech, times.iter().sum::<f64>() / times.len() as f64))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(tech, _)| tech.to_string());

        let mut patterns = Self {
            hourly,
            weekday,
            peak_hour,
            peak_weekday,
            business_hours_pct,
            priority_distribution,
            sla_compliance_by_priority,
            escalations_by_priority,
            overall_sla_compliance,
            fastest_technician,
            insights: Vec::new(),
        };
        patterns.insights = patterns.insights();
        patterns
    }

    fn insights(&self) -> Vec<String> {
        let mut insights = Vec::new();
        if let Some(hour) = self.peak_hour {
            insights.push(format!(
                "Peak ticket volume occurs at {hour:02}:00 UTC; consider staffing adjustments"
            ));
        }
        if !self.sla_compliance_by_priority.is_empty() && self.overall_sla_compliance < SLA_TARGET_PCT {
            insights.push(format!(
                "SLA compliance at {:.1}% is below the {SLA_TARGET_PCT:.0}% target",
                self.overall_sla_compliance
            ));
        }
        if let Some(tech) = &self.fastest_technician {
            insights.push(format!("Fastest resolver: {tech}; consider knowledge sharing"));
        }
        if insights.is_empty() {
            insights.push("No significant patterns detected; performance appears stable".to_string());
        }
        insights
    }
}

/// Index of the largest count, lowest index on ties; `None` when all are zero
fn peak(counts: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, &n) in counts.iter().enumerate() {
        if n > 0 && best.map_or(true, |(_, m)| n > m) {
            best = Some((i, n));
        }
    }
    best.map(|(i, _)| i)
}
