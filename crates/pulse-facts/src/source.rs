//! Upstream data contracts
//!
//! The engine never owns ticket or staffing data. It reads through
//! [`FactSource`] and [`WorkforceProvider`], which a deployment backs with
//! its ticket store and HR system.

use crate::fact::TicketFact;
use crate::query::FactQuery;
use crate::range::DateRange;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Failures reported by upstream providers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Provider could not be reached or failed internally
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Provider did not answer in time
    #[error("source timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Provider rejected the query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

impl SourceError {
    /// Create unavailable error
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Check if a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Read-only provider of per-ticket facts
#[async_trait]
pub trait FactSource: Send + Sync + Debug {
    /// Fetch every fact matching `query`
    async fn query_ticket_facts(&self, query: &FactQuery) -> Result<Vec<TicketFact>, SourceError>;
}

/// Staffing snapshot for a period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkforceCapacity {
    /// Technicians on shift during the period
    pub active_technicians: u32,
    /// Average utilization across those technicians (percent)
    pub avg_utilization: f64,
}

impl WorkforceCapacity {
    /// Create new capacity snapshot
    #[inline]
    #[must_use]
    pub fn new(active_technicians: u32, avg_utilization: f64) -> Self {
        Self {
            active_technicians,
            avg_utilization: avg_utilization.clamp(0.0, 100.0),
        }
    }
}

/// Provider of staffing data
#[async_trait]
pub trait WorkforceProvider: Send + Sync + Debug {
    /// Capacity available in `period`
    async fn get_capacity(&self, period: &DateRange) -> Result<WorkforceCapacity, SourceError>;

    /// Technician ids belonging to a team
    async fn team_members(&self, team_id: &str) -> Result<Vec<String>, SourceError>;
}

/// Fact source over an in-memory list
///
/// Evaluates [`FactQuery::matches`] directly; used by the CLI for fact
/// exports and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactSource {
    facts: Vec<TicketFact>,
}

impl MemoryFactSource {
    /// Create source over `facts`
    #[inline]
    #[must_use]
    pub fn new(facts: Vec<TicketFact>) -> Self {
        Self { facts }
    }

    /// Number of facts held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[async_trait]
impl FactSource for MemoryFactSource {
    async fn query_ticket_facts(&self, query: &FactQuery) -> Result<Vec<TicketFact>, SourceError> {
        let rows: Vec<TicketFact> = self.facts.iter().filter(|f| query.matches(f)).cloned().collect();
        tracing::trace!(label = query.label(), rows = rows.len(), "memory fact query");
        Ok(rows)
    }
}

/// Workforce provider with fixed answers
#[derive(Debug, Clone)]
pub struct StaticWorkforce {
    capacity: WorkforceCapacity,
    teams: BTreeMap<String, Vec<String>>,
}

impl StaticWorkforce {
    /// Create provider that always reports `capacity`
    #[inline]
    #[must_use]
    pub fn new(capacity: WorkforceCapacity) -> Self {
        Self {
            capacity,
            teams: BTreeMap::new(),
        }
    }

    /// Register a team
    #[must_use]
    pub fn with_team<I, S>(mut self, team_id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams
            .insert(team_id.into(), members.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl WorkforceProvider for StaticWorkforce {
    async fn get_capacity(&self, _period: &DateRange) -> Result<WorkforceCapacity, SourceError> {
        Ok(self.capacity)
    }

    async fn team_members(&self, team_id: &str) -> Result<Vec<String>, SourceError> {
        self.teams
            .get(team_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("team {team_id}")))
    }
}
