//! Fixed process checks over the whole period

use crate::advice::Reason;
use crate::detector::Finding;
use crate::profile::ratio;
use crate::record::Severity;
use pulse_facts::TicketFact;
use pulse_series::stats::mean;
use serde::{Deserialize, Serialize};

/// The processes every period is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    ResponseTimeSla,
    FirstContactResolution,
    EscalationRate,
    ReopenRate,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 4] = [
        Self::ResponseTimeSla,
        Self::FirstContactResolution,
        Self::EscalationRate,
        Self::ReopenRate,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResponseTimeSla => "response_time_sla",
            Self::FirstContactResolution => "first_contact_resolution",
            Self::EscalationRate => "escalation_rate",
            Self::ReopenRate => "reopen_rate",
        }
    }
}

/// Period-wide process rates; rates are fractions in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessMetrics {
    pub tickets: usize,
    pub resolved: usize,
    pub avg_response_min: Option<f64>,
    /// Tickets whose first response took longer than the response threshold
    pub slow_responses: usize,
    pub response_excess_hours: f64,
    pub sla_evaluated: usize,
    pub sla_breached: usize,
    pub first_contact: usize,
    pub escalated: usize,
    pub reopened: usize,
}

impl ProcessMetrics {
    /// Measure `facts` against a response threshold in minutes
    #[must_use]
    pub fn measure(facts: &[TicketFact], max_response_min: f64) -> Self {
        let responses: Vec<f64> = facts.iter().filter_map(|f| f.response_time_min).collect();
        let resolved: Vec<&TicketFact> = facts.iter().filter(|f| f.status.is_resolved()).collect();
        Self {
            tickets: facts.len(),
            resolved: resolved.len(),
            avg_response_min: (!responses.is_empty()).then(|| mean(&responses)),
            slow_responses: responses.iter().filter(|r| **r > max_response_min).count(),
            response_excess_hours: responses
                .iter()
                .map(|r| (r - max_response_min).max(0.0))
                .sum::<f64>()
                / 60.0,
            sla_evaluated: facts.iter().filter(|f| f.sla_met.is_some()).count(),
            sla_breached: facts.iter().filter(|f| f.sla_breached()).count(),
            first_contact: resolved.iter().filter(|f| f.first_contact_resolution()).count(),
            escalated: facts.iter().filter(|f| f.escalated).count(),
            reopened: resolved.iter().filter(|f| f.reopened_count > 0).count(),
        }
    }

    #[must_use]
    pub fn violation_rate(&self) -> f64 {
        ratio(self.sla_breached, self.sla_evaluated)
    }

    /// Share of resolved tickets closed on first contact
    #[must_use]
    pub fn first_contact_rate(&self) -> f64 {
        ratio(self.first_contact, self.resolved)
    }

    #[must_use]
    pub fn escalation_rate(&self) -> f64 {
        ratio(self.escalated, self.tickets)
    }

    /// Share of resolved tickets reopened at least once
    #[must_use]
    pub fn reopen_rate(&self) -> f64 {
        ratio(self.reopened, self.resolved)
    }
}

/// Severity from how far a value sits past its threshold
///
/// `excess` is the value/threshold ratio oriented so that 1.0 is exactly at
/// the threshold.
#[must_use]
pub fn severity_for_excess(excess: f64) -> Severity {
    if excess >= 2.0 {
        Severity::Critical
    } else if excess >= 1.5 {
        Severity::High
    } else if excess >= 1.2 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub(crate) struct ProcessLimits {
    pub(crate) max_avg_response_min: f64,
    pub(crate) max_response_violation_rate: f64,
    pub(crate) min_first_contact_rate: f64,
    pub(crate) max_escalation_rate: f64,
    pub(crate) max_reopen_rate: f64,
}

pub(crate) fn check(facts: &[TicketFact], limits: &ProcessLimits) -> Vec<Finding> {
    let metrics = ProcessMetrics::measure(facts, limits.max_avg_response_min);
    if metrics.tickets == 0 {
        return Vec::new();
    }
    ProcessKind::ALL
        .into_iter()
        .filter_map(|kind| check_one(kind, &metrics, limits))
        .collect()
}

fn check_one(kind: ProcessKind, m: &ProcessMetrics, limits: &ProcessLimits) -> Option<Finding> {
    let (reasons, excess, affected, delay) = match kind {
        ProcessKind::ResponseTimeSla => {
            let avg = m.avg_response_min.unwrap_or(0.0);
            let violations = m.violation_rate();
            let mut reasons = Vec::new();
            if avg > limits.max_avg_response_min {
                reasons.push(Reason::SlowResponse);
            }
            if violations > limits.max_response_violation_rate {
                reasons.push(Reason::ResponseViolations);
            }
            let excess = (avg / limits.max_avg_response_min)
                .max(violations / limits.max_response_violation_rate);
            (
                reasons,
                excess,
                m.slow_responses.max(m.sla_breached),
                m.response_excess_hours,
            )
        }
        ProcessKind::FirstContactResolution => {
            if m.resolved == 0 {
                return None;
            }
            let rate = m.first_contact_rate();
            let reasons = if rate < limits.min_first_contact_rate {
                vec![Reason::LowFirstContact]
            } else {
                Vec::new()
            };
            let excess = if rate > 0.0 {
                limits.min_first_contact_rate / rate
            } else {
                f64::INFINITY
            };
            (reasons, excess, m.resolved - m.first_contact, 0.0)
        }
        ProcessKind::EscalationRate => {
            let rate = m.escalation_rate();
            let reasons = if rate > limits.max_escalation_rate {
                vec![Reason::HighEscalation]
            } else {
                Vec::new()
            };
            (reasons, rate / limits.max_escalation_rate, m.escalated, 0.0)
        }
        ProcessKind::ReopenRate => {
            let rate = m.reopen_rate();
            let reasons = if rate > limits.max_reopen_rate {
                vec![Reason::HighReopen]
            } else {
                Vec::new()
            };
            (reasons, rate / limits.max_reopen_rate, m.reopened, 0.0)
        }
    };
    if reasons.is_empty() {
        return None;
    }
    Some(Finding {
        identifier: kind.as_str().to_string(),
        subject: format!("Process {}", kind.as_str()),
        severity: severity_for_excess(excess),
        reasons,
        affected_count: affected,
        delay_impact: delay,
        pressure: (excess - 1.0).clamp(0.0, 1.0),
    })
}
