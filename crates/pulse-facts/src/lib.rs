//! Pulse Facts
//!
//! The vocabulary shared by every part of the analytics engine: ticket facts,
//! date ranges, time buckets, metric names, and the contracts of the upstream
//! providers the engine reads from.
//!
//! # Core Concepts
//!
//! - [`TicketFact`]: One ticket as exported by the ticket store
//! - [`DateRange`]: Validated `[start, end)` window that scopes every query
//! - [`Granularity`]: Hour/day/week/month bucketing
//! - [`FactQuery`]: Parameterized query handed to a [`FactSource`]
//! - [`Clock`]: Injectable time for expiry and timestamps
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_facts::{DateRange, FactQuery, FactSource, MemoryFactSource, TimeBasis};
//!
//! let period = DateRange::trailing_days(now, 30);
//! let query = FactQuery::new(period)
//!     .with_basis(TimeBasis::Resolved)
//!     .in_category("network");
//! let facts = source.query_ticket_facts(&query).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod clock;
mod fact;
mod metric;
mod query;
mod range;
mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fact::{Priority, TicketFact, TicketStatus};
pub use metric::{Metric, UnsupportedMetric};
pub use query::{FactQuery, TimeBasis};
pub use range::{DateRange, Granularity, RangeError};
pub use source::{
    FactSource, MemoryFactSource, SourceError, StaticWorkforce, WorkforceCapacity,
    WorkforceProvider,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn bucketed_metric_over_memory_source() {
        let period = DateRange::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 4, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let facts: Vec<TicketFact> = (0..6)
            .map(|i| {
                TicketFact::new(
                    format!("T-{i}"),
                    "email",
                    "acme",
                    Utc.with_ymd_and_hms(2026, 6, 1 + (i % 3), 10, 0, 0).unwrap(),
                )
            })
            .collect();
        let source = MemoryFactSource::new(facts);

        let rows = source.query_ticket_facts(&FactQuery::new(period)).await.unwrap();
        let buckets = Granularity::Daily.buckets(&period);
        assert_eq!(buckets.len(), 3);
        for bucket in buckets {
            let in_bucket: Vec<&TicketFact> = rows
                .iter()
                .filter(|f| Granularity::Daily.bucket_start(f.created_at) == bucket)
                .collect();
            assert_eq!(Metric::TicketVolume.evaluate(&in_bucket), 2.0);
        }
    }
}
