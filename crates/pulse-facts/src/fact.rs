//! Per-ticket facts as delivered by the ticket store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Still waiting on the helpdesk
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::Pending)
    }

    /// Work on the ticket is finished
    #[inline]
    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// All priorities, lowest first
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One ticket as seen by the analytics engine
///
/// Times are in minutes; instants are UTC. Optional fields are absent until
/// the ticket reaches the relevant stage (first response, resolution, survey).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketFact {
    pub id: String,
    pub status: TicketStatus,
    pub category: String,
    #[serde(default)]
    pub technician_id: Option<String>,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response_time_min: Option<f64>,
    #[serde(default)]
    pub resolution_time_min: Option<f64>,
    #[serde(default)]
    pub sla_met: Option<bool>,
    #[serde(default)]
    pub satisfaction_score: Option<f64>,
    pub priority: Priority,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub reopened_count: u32,
}

impl TicketFact {
    /// Create an open, unassigned, medium-priority ticket
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        customer_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status: TicketStatus::Open,
            category: category.into(),
            technician_id: None,
            customer_id: customer_id.into(),
            created_at,
            resolved_at: None,
            response_time_min: None,
            resolution_time_min: None,
            sla_met: None,
            satisfaction_score: None,
            priority: Priority::Medium,
            escalated: false,
            reopened_count: 0,
        }
    }

    /// Assign to technician
    #[inline]
    #[must_use]
    pub fn assigned_to(mut self, technician_id: impl Into<String>) -> Self {
        self.technician_id = Some(technician_id.into());
        self
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// With first response time
    #[inline]
    #[must_use]
    pub fn responded_after(mut self, minutes: f64) -> Self {
        self.response_time_min = Some(minutes);
        if self.status == TicketStatus::Open {
            self.status = TicketStatus::InProgress;
        }
        self
    }

    /// Mark resolved after `minutes`, recording whether the SLA held
    #[must_use]
    pub fn resolved_after(mut self, minutes: f64, sla_met: bool) -> Self {
        self.status = TicketStatus::Resolved;
        self.resolution_time_min = Some(minutes);
        #[allow(clippy::cast_possible_truncation)]
        let delta = chrono::Duration::seconds((minutes * 60.0) as i64);
        self.resolved_at = Some(self.created_at + delta);
        self.sla_met = Some(sla_met);
        self
    }

    /// With customer satisfaction survey score (1–5)
    #[inline]
    #[must_use]
    pub fn rated(mut self, score: f64) -> Self {
        self.satisfaction_score = Some(score);
        self
    }

    /// Mark escalated
    #[inline]
    #[must_use]
    pub fn escalated(mut self) -> Self {
        self.escalated = true;
        self
    }

    /// With number of times the ticket was reopened
    #[inline]
    #[must_use]
    pub fn reopened(mut self, times: u32) -> Self {
        self.reopened_count = times;
        self
    }

    /// SLA was evaluated and missed
    #[inline]
    #[must_use]
    pub fn sla_breached(&self) -> bool {
        self.sla_met == Some(false)
    }

    /// Resolved without escalation and never reopened
    #[inline]
    #[must_use]
    pub fn first_contact_resolution(&self) -> bool {
        self.status.is_resolved() && !self.escalated && self.reopened_count == 0
    }
}
