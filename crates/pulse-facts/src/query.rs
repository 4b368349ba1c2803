//! Parameterized fact queries
//!
//! [`FactQuery`] carries every filter as data so that any store can
//! translate it into its own query language; [`FactQuery::matches`] gives the
//! reference semantics used by in-memory sources.

use crate::fact::{Priority, TicketFact, TicketStatus};
use crate::range::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which timestamp must fall inside the query period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// `created_at` inside the period
    #[default]
    Created,
    /// `resolved_at` inside the period (unresolved tickets never match)
    Resolved,
}

/// Query over ticket facts for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactQuery {
    period: DateRange,
    basis: TimeBasis,
    technicians: Option<BTreeSet<String>>,
    category: Option<String>,
    customer: Option<String>,
    statuses: BTreeSet<TicketStatus>,
    priorities: BTreeSet<Priority>,
    assigned_only: bool,
    label: String,
}

impl FactQuery {
    /// Query every ticket created in `period`
    #[inline]
    #[must_use]
    pub fn new(period: DateRange) -> Self {
        Self {
            period,
            basis: TimeBasis::Created,
            technicians: None,
            category: None,
            customer: None,
            statuses: BTreeSet::new(),
            priorities: BTreeSet::new(),
            assigned_only: false,
            label: "facts".to_string(),
        }
    }

    /// With time basis
    #[inline]
    #[must_use]
    pub fn with_basis(mut self, basis: TimeBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Restrict to the given technicians
    #[must_use]
    pub fn for_technicians<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.technicians = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to one category
    #[inline]
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to one customer
    #[inline]
    #[must_use]
    pub fn for_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Restrict to statuses (may be called repeatedly)
    #[must_use]
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    /// Restrict to priorities (may be called repeatedly)
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priorities.insert(priority);
        self
    }

    /// Only tickets with a technician assigned
    #[inline]
    #[must_use]
    pub fn assigned_only(mut self) -> Self {
        self.assigned_only = true;
        self
    }

    /// Name used in logs and by sources that route queries
    #[inline]
    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Query period
    #[inline]
    #[must_use]
    pub fn period(&self) -> &DateRange {
        &self.period
    }

    /// Time basis
    #[inline]
    #[must_use]
    pub fn basis(&self) -> TimeBasis {
        self.basis
    }

    /// Query label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Technician restriction, if any
    #[inline]
    #[must_use]
    pub fn technicians(&self) -> Option<&BTreeSet<String>> {
        self.technicians.as_ref()
    }

    /// Category restriction, if any
    #[inline]
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Customer restriction, if any
    #[inline]
    #[must_use]
    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref()
    }

    /// Check a fact against every filter
    #[must_use]
    pub fn matches(&self, fact: &TicketFact) -> bool {
        let in_period = match self.basis {
            TimeBasis::Created => self.period.contains(fact.created_at),
            TimeBasis::Resolved => fact.resolved_at.is_some_and(|at| self.period.contains(at)),
        };
        if !in_period {
            return false;
        }
        if self.assigned_only && fact.technician_id.is_none() {
            return false;
        }
        if let Some(techs) = &self.technicians {
            match &fact.technician_id {
                Some(id) if techs.contains(id) => {}
                _ => return false,
            }
        }
        if self.category.as_deref().is_some_and(|c| c != fact.category) {
            return false;
        }
        if self.customer.as_deref().is_some_and(|c| c != fact.customer_id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&fact.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&fact.priority) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn period() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn fact() -> TicketFact {
        TicketFact::new("T-1", "network", "acme", Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn created_basis_uses_created_at() {
        let query = FactQuery::new(period());
        assert!(query.matches(&fact()));

        let mut outside = fact();
        outside.created_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert!(!query.matches(&outside));
    }

    #[test]
    fn resolved_basis_skips_unresolved() {
        let query = FactQuery::new(period()).with_basis(TimeBasis::Resolved);
        assert!(!query.matches(&fact()));
        assert!(query.matches(&fact().resolved_after(60.0, true)));

        let mut late = fact().resolved_after(60.0, true);
        late.resolved_at = Some(late.created_at + Duration::days(30));
        assert!(!query.matches(&late));
    }

    #[test]
    fn technician_filter_excludes_unassigned() {
        let query = FactQuery::new(period()).for_technicians(["tech-1", "tech-2"]);
        assert!(!query.matches(&fact()));
        assert!(query.matches(&fact().assigned_to("tech-2")));
        assert!(!query.matches(&fact().assigned_to("tech-9")));
    }

    #[test]
    fn status_and_priority_filters_combine() {
        let query = FactQuery::new(period())
            .with_status(TicketStatus::Open)
            .with_priority(Priority::Critical);
        assert!(!query.matches(&fact()));
        assert!(query.matches(&fact().with_priority(Priority::Critical)));
        assert!(!query.matches(&fact().with_priority(Priority::Critical).resolved_after(5.0, true)));
    }

    #[test]
    fn category_and_customer_filters() {
        let query = FactQuery::new(period()).in_category("network").for_customer("acme");
        assert!(query.matches(&fact()));
        let query = FactQuery::new(period()).for_customer("globex");
        assert!(!query.matches(&fact()));
    }

    #[test]
    fn label_defaults_and_overrides() {
        assert_eq!(FactQuery::new(period()).label(), "facts");
        assert_eq!(FactQuery::new(period()).labelled("sla").label(), "sla");
    }
}
