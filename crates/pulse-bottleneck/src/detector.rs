//! The generic entity-anomaly detector
//!
//! One detector type covers every dimension. The [`ThresholdTable`] variant it
//! carries selects how entities are keyed and which rules apply.

use crate::advice::{self, Reason};
use crate::process::{self, ProcessLimits};
use crate::profile::{profile_by, ratio, Cohort, EntityProfile};
use crate::record::{BottleneckRecord, Dimension, Severity};
use crate::thresholds::ThresholdTable;
use chrono::{DateTime, Utc};
use pulse_facts::TicketFact;
use pulse_series::stats::percentile;

/// A flagged entity before it becomes a record
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Finding {
    pub(crate) identifier: String,
    pub(crate) subject: String,
    pub(crate) severity: Severity,
    pub(crate) reasons: Vec<Reason>,
    pub(crate) affected_count: usize,
    pub(crate) delay_impact: f64,
    /// How far past the rules the entity is, in `[0, 1]`
    pub(crate) pressure: f64,
}

impl Finding {
    fn into_record(self, dimension: Dimension, detected_at: DateTime<Utc>) -> BottleneckRecord {
        let risk_score = (self.severity.base_risk() + 30.0 * self.pressure.clamp(0.0, 1.0)).min(100.0);
        BottleneckRecord {
            dimension,
            description: advice::describe(&self.subject, &self.reasons),
            recommendations: advice::recommend(&self.reasons),
            identifier: self.identifier,
            severity: self.severity,
            affected_count: self.affected_count,
            delay_impact: self.delay_impact,
            risk_score,
            detected_at,
        }
    }
}

/// Flags entities of one dimension whose metrics break its rule table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityAnomalyDetector {
    table: ThresholdTable,
}

impl EntityAnomalyDetector {
    /// Create new detector with the default table for `dimension`
    #[inline]
    #[must_use]
    pub fn new(dimension: Dimension) -> Self {
        Self {
            table: ThresholdTable::defaults(dimension),
        }
    }

    /// Create new detector with an explicit table
    #[inline]
    #[must_use]
    pub fn with_table(table: ThresholdTable) -> Self {
        Self { table }
    }

    /// One detector per dimension, in detection order
    #[must_use]
    pub fn all() -> [Self; 4] {
        Dimension::ALL.map(Self::new)
    }

    #[inline]
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.table.dimension()
    }

    #[inline]
    #[must_use]
    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    /// Evaluate the rules over `facts`
    ///
    /// Records come back ordered by identifier; callers merge and sort across
    /// dimensions.
    #[must_use]
    pub fn detect(&self, facts: &[TicketFact], detected_at: DateTime<Utc>) -> Vec<BottleneckRecord> {
        let findings = match self.table {
            ThresholdTable::Technician {
                max_tickets,
                max_breach_rate,
                high_tickets,
                high_breach_rate,
                critical_tickets,
                critical_breach_rate,
            } => {
                let cohort = Cohort::from_facts(facts);
                profile_by(facts, |f| f.technician_id.as_deref())
                    .into_iter()
                    .filter_map(|p| {
                        let breach = p.breach_rate();
                        let mut reasons = Vec::new();
                        if p.tickets > max_tickets {
                            reasons.push(Reason::HighVolume);
                        }
                        if breach > max_breach_rate {
                            reasons.push(Reason::HighBreachRate);
                        }
                        if reasons.is_empty() {
                            return None;
                        }
                        let severity = if breach > critical_breach_rate || p.tickets > critical_tickets {
                            Severity::Critical
                        } else if breach > high_breach_rate || p.tickets > high_tickets {
                            Severity::High
                        } else {
                            Severity::Medium
                        };
                        let load = ratio(p.tickets, critical_tickets).min(1.0);
                        Some(finding("Technician", &p, severity, reasons, cohort, breach.max(load)))
                    })
                    .collect()
            }
            ThresholdTable::Category {
                resolution_ratio,
                breach_ratio,
                max_breach_rate,
                high_ratio,
                high_breach_rate,
                critical_ratio,
                critical_breach_rate,
            } => {
                let cohort = Cohort::from_facts(facts);
                profile_by(facts, |f| Some(f.category.as_str()))
                    .into_iter()
                    .filter_map(|p| {
                        let breach = p.breach_rate();
                        let slow = match p.avg_resolution_min {
                            Some(avg) if cohort.avg_resolution_min > 0.0 => avg / cohort.avg_resolution_min,
                            _ => 0.0,
                        };
                        let breach_multiple = if cohort.breach_rate > 0.0 {
                            breach / cohort.breach_rate
                        } else {
                            0.0
                        };
                        let mut reasons = Vec::new();
                        if slow >= resolution_ratio {
                            reasons.push(Reason::SlowResolution);
                        }
                        if breach_multiple >= breach_ratio {
                            reasons.push(Reason::BreachAboveCohort);
                        }
                        if breach > max_breach_rate {
                            reasons.push(Reason::HighBreachRate);
                        }
                        if reasons.is_empty() {
                            return None;
                        }
                        let multiple = slow.max(breach_multiple);
                        let severity = if multiple >= critical_ratio || breach > critical_breach_rate {
                            Severity::Critical
                        } else if multiple >= high_ratio || breach > high_breach_rate {
                            Severity::High
                        } else {
                            Severity::Medium
                        };
                        let pressure = breach.max(((multiple - 1.0) / 2.0).clamp(0.0, 1.0));
                        Some(finding("Category", &p, severity, reasons, cohort, pressure))
                    })
                    .collect()
            }
            ThresholdTable::Customer {
                min_tickets,
                percentile: pct,
                min_satisfaction,
                max_critical_share,
            } => {
                let cohort = Cohort::from_facts(facts);
                let profiles = profile_by(facts, |f| Some(f.customer_id.as_str()));
                let compared: Vec<&EntityProfile> = profiles.iter().filter(|p| p.tickets >= min_tickets).collect();
                // a lone customer is always its own percentile
                let cuts = if compared.len() < 2 {
                    None
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let volumes: Vec<f64> = compared.iter().map(|p| p.tickets as f64).collect();
                    let breaches: Vec<f64> = compared.iter().map(|p| p.breach_rate()).collect();
                    percentile(&volumes, pct).zip(percentile(&breaches, pct))
                };
                profiles
                    .into_iter()
                    .filter_map(|p| {
                        let breach = p.breach_rate();
                        #[allow(clippy::cast_precision_loss)]
                        let volume = p.tickets as f64;
                        let mut reasons = Vec::new();
                        if let Some((volume_cut, breach_cut)) = cuts.filter(|_| p.tickets >= min_tickets) {
                            if volume >= volume_cut {
                                reasons.push(Reason::VolumeOutlier);
                            }
                            if breach > 0.0 && breach >= breach_cut {
                                reasons.push(Reason::BreachOutlier);
                            }
                        }
                        if p.avg_satisfaction.is_some_and(|s| s < min_satisfaction) {
                            reasons.push(Reason::LowSatisfaction);
                        }
                        if p.critical_share() > max_critical_share {
                            reasons.push(Reason::CriticalHeavy);
                        }
                        let severity = match reasons.as_slice() {
                            [] => return None,
                            [Reason::VolumeOutlier] => Severity::Low,
                            [_] => Severity::Medium,
                            [_, _] => Severity::High,
                            _ => Severity::Critical,
                        };
                        let pressure = ratio(reasons.len(), 4);
                        Some(finding("Customer", &p, severity, reasons, cohort, pressure))
                    })
                    .collect()
            }
            ThresholdTable::Process {
                max_avg_response_min,
                max_response_violation_rate,
                min_first_contact_rate,
                max_escalation_rate,
                max_reopen_rate,
            } => process::check(
                facts,
                &ProcessLimits {
                    max_avg_response_min,
                    max_response_violation_rate,
                    min_first_contact_rate,
                    max_escalation_rate,
                    max_reopen_rate,
                },
            ),
        };

        let dimension = self.dimension();
        findings
            .into_iter()
            .map(|f| f.into_record(dimension, detected_at))
            .collect()
    }
}

fn finding(
    kind: &str,
    profile: &EntityProfile,
    severity: Severity,
    reasons: Vec<Reason>,
    cohort: Cohort,
    pressure: f64,
) -> Finding {
    Finding {
        identifier: profile.identifier.clone(),
        subject: format!("{kind} {}", profile.identifier),
        severity,
        reasons,
        affected_count: profile.tickets,
        delay_impact: profile.excess_hours(cohort.avg_resolution_min),
        pressure,
    }
}
