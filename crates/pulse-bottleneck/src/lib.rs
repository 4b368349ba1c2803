//! Pulse Bottleneck
//!
//! Finds the technicians, categories, customers and processes that are holding
//! the helpdesk back.
//!
//! A single [`EntityAnomalyDetector`] handles every [`Dimension`]: the
//! [`ThresholdTable`] variant it carries decides how tickets are grouped and
//! which rules flag a group. [`BottleneckDetectorSet`] runs all four
//! concurrently, each against its own upstream query, so one failing query
//! only loses that dimension's records.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_bottleneck::BottleneckDetectorSet;
//!
//! let report = BottleneckDetectorSet::new().detect(&source, period, now).await;
//! for record in &report.records {
//!     println!("{} {} {:?}", record.dimension, record.identifier, record.severity);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod advice;
pub mod detector;
pub mod process;
pub mod profile;
pub mod record;
pub mod set;
pub mod thresholds;

pub use advice::Reason;
pub use detector::EntityAnomalyDetector;
pub use process::{ProcessKind, ProcessMetrics};
pub use profile::{Cohort, EntityProfile};
pub use record::{sort_by_urgency, BottleneckRecord, Dimension, Severity};
pub use set::{BottleneckDetectorSet, DetectionReport};
pub use thresholds::ThresholdTable;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use pulse_facts::{Priority, TicketFact};

    fn arb_fact() -> impl Strategy<Value = TicketFact> {
        (
            0usize..6,
            0usize..4,
            0usize..8,
            prop::option::of((1.0f64..2_000.0, any::<bool>())),
            prop::option::of(1.0f64..600.0),
            any::<bool>(),
            0u32..3,
            0usize..4,
        )
            .prop_map(|(tech, category, customer, resolution, response, escalated, reopened, priority)| {
                let created = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
                let mut fact = TicketFact::new(
                    format!("T-{tech}-{category}-{customer}"),
                    format!("cat{category}"),
                    format!("cust{customer}"),
                    created,
                )
                .with_priority(Priority::ALL[priority])
                .reopened(reopened);
                if tech > 0 {
                    fact = fact.assigned_to(format!("tech{tech}"));
                }
                if let Some(minutes) = response {
                    fact = fact.responded_after(minutes);
                }
                if let Some((minutes, met)) = resolution {
                    fact = fact.resolved_after(minutes, met);
                }
                if escalated {
                    fact = fact.escalated();
                }
                fact
            })
    }

    proptest! {
        #[test]
        fn records_stay_in_bounds(facts in prop::collection::vec(arb_fact(), 0..120)) {
            let now = Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap();
            for detector in EntityAnomalyDetector::all() {
                for record in detector.detect(&facts, now) {
                    prop_assert!((0.0..=100.0).contains(&record.risk_score));
                    prop_assert!(record.delay_impact >= 0.0);
                    prop_assert!(!record.recommendations.is_empty());
                    prop_assert_eq!(record.dimension, detector.dimension());
                }
            }
        }

        #[test]
        fn detection_is_deterministic(facts in prop::collection::vec(arb_fact(), 0..60)) {
            let now = Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap();
            for detector in EntityAnomalyDetector::all() {
                prop_assert_eq!(detector.detect(&facts, now), detector.detect(&facts, now));
            }
        }
    }
}
