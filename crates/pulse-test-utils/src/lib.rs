//! Testing utilities for the Helpdesk Pulse workspace
//!
//! Shared fixtures, scenario builders and instrumented fact sources.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use pulse_facts::{FactQuery, FactSource, MemoryFactSource, SourceError, TicketFact};
use std::sync::atomic::{AtomicUsize, Ordering};

pub use pulse_facts::ManualClock;

/// Fixed instant most scenarios are anchored on (a Monday, midnight UTC)
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
}

/// Plain open ticket
pub fn ticket(id: impl Into<String>, created_at: DateTime<Utc>) -> TicketFact {
    TicketFact::new(id, "general", "acme", created_at)
}

/// `per_day` resolved tickets on each of the `days` days before `end`
///
/// Tickets are created at 10:00 and resolved in one hour within SLA.
pub fn steady_daily_volume(end: DateTime<Utc>, days: u32, per_day: u32) -> Vec<TicketFact> {
    let first = end - Duration::days(i64::from(days));
    (0..days)
        .flat_map(|day| {
            (0..per_day).map(move |n| {
                let created = first + Duration::days(i64::from(day)) + Duration::hours(10);
                TicketFact::new(format!("D{day}-{n}"), "general", "acme", created)
                    .assigned_to(format!("tech{}", n % 3))
                    .responded_after(15.0)
                    .resolved_after(60.0, true)
            })
        })
        .collect()
}

/// One technician carrying most of the open backlog while breaching SLA
///
/// `ana` holds 30 tickets: 10 breached, 10 resolved within SLA and 10
/// still open. `bo` and `cy` hold a handful each, all within SLA.
pub fn overloaded_technician(now: DateTime<Utc>) -> Vec<TicketFact> {
    let mut facts = Vec::new();
    for n in 0..30 {
        let created = now - Duration::hours(2 + i64::from(n));
        let fact = TicketFact::new(format!("A{n}"), "network", "acme", created).assigned_to("ana");
        facts.push(match n % 3 {
            0 => fact.resolved_after(900.0, false),
            1 => fact.resolved_after(120.0, true),
            _ => fact,
        });
    }
    for (tech, count) in [("bo", 4), ("cy", 5)] {
        for n in 0..count {
            let created = now - Duration::hours(3 + i64::from(n));
            facts.push(
                TicketFact::new(format!("{tech}{n}"), "email", "globex", created)
                    .assigned_to(tech)
                    .resolved_after(45.0, true),
            );
        }
    }
    facts
}

/// Wraps a source and records every query it is asked
#[derive(Debug)]
pub struct CountingSource {
    inner: MemoryFactSource,
    calls: AtomicUsize,
    labels: Mutex<Vec<String>>,
}

impl CountingSource {
    pub fn new(facts: Vec<TicketFact>) -> Self {
        Self {
            inner: MemoryFactSource::new(facts),
            calls: AtomicUsize::new(0),
            labels: Mutex::new(Vec::new()),
        }
    }

    /// Queries answered so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Labels of every query, in arrival order
    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }
}

#[async_trait]
impl FactSource for CountingSource {
    async fn query_ticket_facts(&self, query: &FactQuery) -> Result<Vec<TicketFact>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.labels.lock().push(query.label().to_string());
        self.inner.query_ticket_facts(query).await
    }
}

/// Source that fails every query whose label starts with a given prefix
#[derive(Debug)]
pub struct FailingSource {
    inner: MemoryFactSource,
    prefixes: Vec<String>,
}

impl FailingSource {
    pub fn new(facts: Vec<TicketFact>) -> Self {
        Self {
            inner: MemoryFactSource::new(facts),
            prefixes: Vec::new(),
        }
    }

    /// Also fail queries labelled `prefix*`
    #[must_use]
    pub fn failing_on(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Fail every query
    #[must_use]
    pub fn failing_all(self) -> Self {
        self.failing_on("")
    }
}

#[async_trait]
impl FactSource for FailingSource {
    async fn query_ticket_facts(&self, query: &FactQuery) -> Result<Vec<TicketFact>, SourceError> {
        if self.prefixes.iter().any(|p| query.label().starts_with(p.as_str())) {
            return Err(SourceError::unavailable(format!("{} refused", query.label())));
        }
        self.inner.query_ticket_facts(query).await
    }
}
