//! Fixed threshold tables, one per dimension
//!
//! The values are operational constants, not tuned parameters. Rates are
//! fractions in `[0, 1]`; times are minutes.

use crate::record::Dimension;
use serde::{Deserialize, Serialize};

/// Thresholds for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum ThresholdTable {
    Technician {
        /// Flag above this many tickets
        max_tickets: usize,
        /// Flag above this breach rate
        max_breach_rate: f64,
        high_tickets: usize,
        high_breach_rate: f64,
        critical_tickets: usize,
        critical_breach_rate: f64,
    },
    Category {
        /// Flag at or above this multiple of the overall resolution time
        resolution_ratio: f64,
        /// Flag at or above this multiple of the overall breach rate
        breach_ratio: f64,
        /// Flag above this absolute breach rate
        max_breach_rate: f64,
        high_ratio: f64,
        high_breach_rate: f64,
        critical_ratio: f64,
        critical_breach_rate: f64,
    },
    Customer {
        /// Customers below this volume stay out of the percentile comparison
        min_tickets: usize,
        /// Cohort percentile (0–100) that marks an outlier
        percentile: f64,
        /// Flag below this average satisfaction
        min_satisfaction: f64,
        /// Flag above this share of critical tickets
        max_critical_share: f64,
    },
    Process {
        max_avg_response_min: f64,
        max_response_violation_rate: f64,
        min_first_contact_rate: f64,
        max_escalation_rate: f64,
        max_reopen_rate: f64,
    },
}

impl ThresholdTable {
    /// Default table for `dimension`
    #[must_use]
    pub fn defaults(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Technician => Self::Technician {
                max_tickets: 20,
                max_breach_rate: 0.30,
                high_tickets: 35,
                high_breach_rate: 0.40,
                critical_tickets: 50,
                critical_breach_rate: 0.50,
            },
            Dimension::Category => Self::Category {
                resolution_ratio: 1.5,
                breach_ratio: 1.5,
                max_breach_rate: 0.30,
                high_ratio: 2.0,
                high_breach_rate: 0.40,
                critical_ratio: 3.0,
                critical_breach_rate: 0.50,
            },
            Dimension::Customer => Self::Customer {
                min_tickets: 10,
                percentile: 90.0,
                min_satisfaction: 3.0,
                max_critical_share: 0.30,
            },
            Dimension::Process => Self::Process {
                max_avg_response_min: 120.0,
                max_response_violation_rate: 0.30,
                min_first_contact_rate: 0.70,
                max_escalation_rate: 0.20,
                max_reopen_rate: 0.10,
            },
        }
    }

    /// Dimension this table applies to
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Technician { .. } => Dimension::Technician,
            Self::Category { .. } => Dimension::Category,
            Self::Customer { .. } => Dimension::Customer,
            Self::Process { .. } => Dimension::Process,
        }
    }
}
