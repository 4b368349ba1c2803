//! Why an entity was flagged, and what to do about it

/// A rule that fired for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reason {
    HighVolume,
    HighBreachRate,
    SlowResolution,
    BreachAboveCohort,
    VolumeOutlier,
    BreachOutlier,
    LowSatisfaction,
    CriticalHeavy,
    SlowResponse,
    ResponseViolations,
    LowFirstContact,
    HighEscalation,
    HighReopen,
}

impl Reason {
    /// Short phrase used in record descriptions
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::HighVolume => "ticket load above capacity threshold",
            Self::HighBreachRate => "SLA breach rate above threshold",
            Self::SlowResolution => "resolution time well above average",
            Self::BreachAboveCohort => "SLA breach rate well above average",
            Self::VolumeOutlier => "ticket volume in the top decile",
            Self::BreachOutlier => "SLA breach rate in the top decile",
            Self::LowSatisfaction => "satisfaction below 3.0",
            Self::CriticalHeavy => "large share of critical tickets",
            Self::SlowResponse => "average first response too slow",
            Self::ResponseViolations => "too many response SLA violations",
            Self::LowFirstContact => "first-contact resolution too low",
            Self::HighEscalation => "escalation rate too high",
            Self::HighReopen => "reopen rate too high",
        }
    }

    /// Operational guidance for this condition
    #[must_use]
    pub fn advice(self) -> &'static str {
        match self {
            Self::HighVolume => "Redistribute new assignments to technicians with spare capacity",
            Self::HighBreachRate => "Review open tickets nearing SLA deadlines and reassign the oldest",
            Self::SlowResolution => "Create or update knowledge-base articles for recurring issues in this category",
            Self::BreachAboveCohort => "Revisit SLA targets and routing rules for this category",
            Self::VolumeOutlier => "Schedule a service review to find the root cause of repeat requests",
            Self::BreachOutlier => "Assign a dedicated contact to restore SLA performance",
            Self::LowSatisfaction => "Follow up with the customer and review recent interactions",
            Self::CriticalHeavy => "Check priority classification and offer proactive monitoring",
            Self::SlowResponse => "Add first-response coverage at peak hours or enable auto-acknowledgement",
            Self::ResponseViolations => "Tighten triage so tickets reach a technician before the response SLA",
            Self::LowFirstContact => "Expand first-line troubleshooting scripts and permissions",
            Self::HighEscalation => "Train first-line staff on the most frequently escalated issue types",
            Self::HighReopen => "Add a resolution verification step before closing tickets",
        }
    }
}

/// Description line for an entity
#[must_use]
pub fn describe(subject: &str, reasons: &[Reason]) -> String {
    let phrases: Vec<&str> = reasons.iter().map(|r| r.phrase()).collect();
    format!("{subject}: {}", phrases.join("; "))
}

/// Recommendations for a set of reasons, deduplicated, in reason order
#[must_use]
pub fn recommend(reasons: &[Reason]) -> Vec<String> {
    let mut sorted = reasons.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted.into_iter().map(|r| r.advice().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_joins_phrases() {
        let text = describe("Technician ana", &[Reason::HighVolume, Reason::HighBreachRate]);
        assert_eq!(
            text,
            "Technician ana: ticket load above capacity threshold; SLA breach rate above threshold"
        );
    }

    #[test]
    fn recommendations_are_unique() {
        let recs = recommend(&[Reason::HighReopen, Reason::HighVolume, Reason::HighReopen]);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("Redistribute"));
    }
}
