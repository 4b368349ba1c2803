//! Staffing capacity prediction
//!
//! Turns a volume forecast and a workforce snapshot into required and
//! available hours, then derives actions, risks and a confidence score from
//! fixed rules.

use crate::config::WorkCalendar;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use pulse_facts::{DateRange, WorkforceCapacity};
use pulse_series::{TrendDirection, TrendResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-day forecasts are clamped into this multiple of the last observation
const FORECAST_CLAMP: (f64, f64) = (0.5, 3.0);
const VARIANCE_LIMIT_HOURS_SQ: f64 = 120.0;
const CONFIDENCE_RANGE: (f64, f64) = (0.3, 0.95);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Hire,
    Overtime,
    Reassign,
    Training,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Recommended staffing action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityAction {
    pub kind: ActionKind,
    pub urgency: Urgency,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    SlaBreach,
    Overload,
    SkillGap,
}

impl RiskKind {
    /// Standard mitigation for this risk
    #[must_use]
    pub fn mitigation(self) -> &'static str {
        match self {
            Self::SlaBreach => "Prioritize tickets nearest their SLA deadline and enable breach alerts",
            Self::Overload => "Defer non-urgent work and spread new tickets across teams",
            Self::SkillGap => "Pair less experienced technicians with specialists on complex tickets",
        }
    }
}

/// Operational risk implied by the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRisk {
    pub kind: RiskKind,
    /// `[0, 1]`
    pub probability: f64,
    pub mitigation: String,
}

/// Predicted staffing position for a future period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityForecast {
    pub period: DateRange,
    pub predicted_volume: f64,
    pub required_hours: f64,
    pub available_hours: f64,
    /// Percent, capped at 100
    pub utilization_pct: f64,
    /// Required minus available; negative means spare capacity
    pub staffing_gap_hours: f64,
    pub recommended_actions: Vec<CapacityAction>,
    pub risks: Vec<CapacityRisk>,
    /// `[0.3, 0.95]`
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

/// Everything a prediction needs
#[derive(Debug, Clone, Copy)]
pub struct CapacityInputs<'a> {
    /// Period being staffed
    pub period: DateRange,
    /// Daily ticket volume history with its forecast
    pub volume: &'a TrendResult,
    pub workforce: WorkforceCapacity,
    pub avg_resolution_hours: f64,
    /// Variance of resolution time, hours²
    pub resolution_variance: f64,
    /// Resolved tickets behind the resolution statistics
    pub historical_samples: usize,
}

/// Applies the capacity rules under a work calendar
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapacityPredictor {
    calendar: WorkCalendar,
}

impl CapacityPredictor {
    /// Create new predictor
    #[inline]
    #[must_use]
    pub fn new(calendar: WorkCalendar) -> Self {
        Self { calendar }
    }

    /// Predict the staffing position for `inputs.period`
    #[must_use]
    pub fn predict(&self, inputs: &CapacityInputs<'_>, generated_at: DateTime<Utc>) -> CapacityForecast {
        let days = inputs.period.calendar_days();
        let predicted_volume = predicted_volume(inputs.volume, &days);
        let required_hours = predicted_volume * inputs.avg_resolution_hours;
        let available_hours = f64::from(inputs.workforce.active_technicians)
            * self.working_days(&days)
            * self.calendar.effective_hours_per_day();

        let utilization_pct = if available_hours > 0.0 {
            (required_hours / available_hours * 100.0).min(100.0)
        } else if required_hours > 0.0 {
            100.0
        } else {
            0.0
        };
        let staffing_gap_hours = required_hours - available_hours;

        let recommended_actions = actions(utilization_pct, staffing_gap_hours, inputs.resolution_variance);
        let risks = risks(
            utilization_pct,
            staffing_gap_hours,
            required_hours,
            inputs.resolution_variance,
        );
        let confidence = confidence(inputs);

        tracing::debug!(
            "capacity {}: volume {:.1}, required {:.1}h, available {:.1}h, utilization {:.1}%",
            inputs.period,
            predicted_volume,
            required_hours,
            available_hours,
            utilization_pct
        );

        CapacityForecast {
            period: inputs.period,
            predicted_volume,
            required_hours,
            available_hours,
            utilization_pct,
            staffing_gap_hours,
            recommended_actions,
            risks,
            confidence,
            generated_at,
        }
    }

    /// Dates that fall on a working weekday
    #[allow(clippy::cast_precision_loss)]
    fn working_days(&self, days: &[NaiveDate]) -> f64 {
        days.iter()
            .filter(|d| d.weekday().num_days_from_monday() < self.calendar.days_per_week)
            .count() as f64
    }
}

/// Sum of per-day forecasts over `days`
///
/// Days past the forecast horizon reuse the last forecast value. Without a
/// forecast every day is assumed to repeat the last observation.
#[allow(clippy::cast_precision_loss)]
fn predicted_volume(volume: &TrendResult, days: &[NaiveDate]) -> f64 {
    let Some(last) = volume.last_value() else {
        return 0.0;
    };
    let forecast = match volume.forecast.as_deref() {
        Some(points) if !points.is_empty() => points,
        _ => return last * days.len() as f64,
    };
    let by_day: BTreeMap<NaiveDate, f64> = forecast
        .iter()
        .map(|p| (p.date.date_naive(), p.predicted_value))
        .collect();
    let tail = forecast.last().map_or(last, |p| p.predicted_value);
    let (lo, hi) = (last * FORECAST_CLAMP.0, last * FORECAST_CLAMP.1);

    days.iter()
        .map(|day| by_day.get(day).copied().unwrap_or(tail).clamp(lo, hi))
        .sum()
}

/// Actions from predicted utilization, the staffing gap and resolution spread
///
/// The gap rules stack on top of an immediate hire: a saturated period still
/// needs its shortfall covered.
fn actions(utilization: f64, gap: f64, variance: f64) -> Vec<CapacityAction> {
    let mut actions = Vec::new();
    let mut push = |kind, urgency, description: String| {
        actions.push(CapacityAction {
            kind,
            urgency,
            description,
        });
    };

    if utilization > 95.0 {
        push(
            ActionKind::Hire,
            Urgency::Critical,
            format!("Utilization at {utilization:.0}%: add technicians or contractors immediately"),
        );
    }
    if gap > 200.0 {
        push(
            ActionKind::Hire,
            Urgency::High,
            format!("Staffing gap of {gap:.0} hours: open requisitions for additional technicians"),
        );
    } else if gap > 0.0 {
        push(
            ActionKind::Overtime,
            Urgency::Medium,
            format!("Cover the {gap:.0} hour gap with scheduled overtime"),
        );
    }
    if utilization > 85.0 {
        push(
            ActionKind::Reassign,
            Urgency::Medium,
            "Rebalance assignments across teams to relieve the most loaded technicians".to_string(),
        );
    }
    if variance > VARIANCE_LIMIT_HOURS_SQ {
        push(
            ActionKind::Training,
            Urgency::Medium,
            "Cross-train technicians to narrow the spread of resolution times".to_string(),
        );
    }
    if utilization < 60.0 {
        push(
            ActionKind::Training,
            Urgency::Low,
            format!("Use spare capacity ({utilization:.0}% utilization) for training and knowledge-base work"),
        );
    }
    actions
}

fn risks(utilization: f64, gap: f64, required: f64, variance: f64) -> Vec<CapacityRisk> {
    let mut risks = Vec::new();
    let mut push = |kind: RiskKind, probability: f64| {
        risks.push(CapacityRisk {
            kind,
            probability: probability.clamp(0.0, 1.0),
            mitigation: kind.mitigation().to_string(),
        });
    };

    if utilization > 80.0 {
        push(RiskKind::SlaBreach, 0.5 + (utilization - 80.0) / 40.0);
    }
    if gap > 0.0 {
        let shortfall = if required > 0.0 { gap / required } else { 1.0 };
        push(RiskKind::Overload, 0.5 + shortfall / 2.0);
    }
    if variance > VARIANCE_LIMIT_HOURS_SQ {
        push(RiskKind::SkillGap, 0.5 + (variance - VARIANCE_LIMIT_HOURS_SQ) / 240.0);
    }
    risks
}

fn confidence(inputs: &CapacityInputs<'_>) -> f64 {
    let mut score = 0.5;
    if inputs.historical_samples > 100 {
        score += 0.2;
    }
    if inputs.volume.samples.len() > 30 {
        score += 0.15;
    }
    if inputs.volume.direction == TrendDirection::Stable {
        score += 0.1;
    }
    if inputs.resolution_variance > VARIANCE_LIMIT_HOURS_SQ {
        score -= 0.1;
    }
    if let Some(signal) = &inputs.volume.seasonality {
        score += signal.strength * 0.1;
    }
    score.clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pulse_facts::{Granularity, Metric};
    use pulse_series::MetricSample;

    fn history(values: &[f64]) -> TrendResult {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 0, 0, 0).unwrap();
        let samples: Vec<MetricSample> = values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricSample::new(start + Duration::days(i as i64), *v))
            .collect();
        let period = DateRange::following_days(start, values.len() as u32);
        TrendResult::build(Metric::TicketVolume, period, Granularity::Daily, samples, 14).unwrap()
    }

    /// Monday 2026-06-01 for one week
    fn next_week() -> DateRange {
        DateRange::following_days(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(), 7)
    }

    fn inputs(volume: &TrendResult, technicians: u32) -> CapacityInputs<'_> {
        CapacityInputs {
            period: next_week(),
            volume,
            workforce: WorkforceCapacity::new(technicians, 70.0),
            avg_resolution_hours: 2.0,
            resolution_variance: 10.0,
            historical_samples: 50,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn flat_history_without_forecast_repeats_last_value() {
        let volume = history(&[10.0, 10.0]);
        assert!(volume.forecast.is_none());
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 2), now());
        assert!((forecast.predicted_volume - 70.0).abs() < 1e-9);
        assert!((forecast.required_hours - 140.0).abs() < 1e-9);
        // 2 technicians × 5 weekdays × 6.4h
        assert!((forecast.available_hours - 64.0).abs() < 1e-9);
        assert_eq!(forecast.utilization_pct, 100.0);
        assert!((forecast.staffing_gap_hours - 76.0).abs() < 1e-9);
    }

    fn kinds(forecast: &CapacityForecast) -> Vec<(ActionKind, Urgency)> {
        forecast
            .recommended_actions
            .iter()
            .map(|a| (a.kind, a.urgency))
            .collect()
    }

    #[test]
    fn no_workforce_means_full_utilization() {
        let volume = history(&[40.0, 40.0, 40.0]);
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 0), now());
        assert_eq!(forecast.available_hours, 0.0);
        assert_eq!(forecast.utilization_pct, 100.0);
        assert!((forecast.staffing_gap_hours - 560.0).abs() < 1e-9);
        assert!(forecast.risks.iter().any(|r| r.kind == RiskKind::Overload && r.probability == 1.0));
        assert!(forecast.risks.iter().any(|r| r.kind == RiskKind::SlaBreach));
        assert_eq!(
            kinds(&forecast),
            vec![
                (ActionKind::Hire, Urgency::Critical),
                (ActionKind::Hire, Urgency::High),
                (ActionKind::Reassign, Urgency::Medium),
            ]
        );
    }

    #[test]
    fn small_load_with_no_staff_still_hires() {
        let volume = history(&[4.0, 4.0]);
        let mut input = inputs(&volume, 0);
        input.workforce = WorkforceCapacity::new(0, 0.0);
        input.avg_resolution_hours = 1.0;
        let forecast = CapacityPredictor::default().predict(&input, now());
        assert!((forecast.required_hours - 28.0).abs() < 1e-9);
        assert!(forecast
            .recommended_actions
            .iter()
            .any(|a| a.kind == ActionKind::Hire && a.urgency >= Urgency::High));
        assert!(forecast.recommended_actions.iter().all(|a| a.kind != ActionKind::Training));
        assert_eq!(
            kinds(&forecast),
            vec![
                (ActionKind::Hire, Urgency::Critical),
                (ActionKind::Overtime, Urgency::Medium),
                (ActionKind::Reassign, Urgency::Medium),
            ]
        );
    }

    #[test]
    fn small_gap_hires_and_covers_with_overtime() {
        let volume = history(&[10.0, 10.0]);
        // required 140h, available 4 × 5 × 6.4 = 128h
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 4), now());
        assert_eq!(forecast.utilization_pct, 100.0);
        assert_eq!(
            kinds(&forecast),
            vec![
                (ActionKind::Hire, Urgency::Critical),
                (ActionKind::Overtime, Urgency::Medium),
                (ActionKind::Reassign, Urgency::Medium),
            ]
        );
    }

    #[test]
    fn heavy_but_covered_load_is_rebalanced() {
        let volume = history(&[8.0, 8.0]);
        // required 112h of 128h
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 4), now());
        assert!((forecast.utilization_pct - 87.5).abs() < 1e-9);
        assert!(forecast.staffing_gap_hours < 0.0);
        assert_eq!(kinds(&forecast), vec![(ActionKind::Reassign, Urgency::Medium)]);
    }

    #[test]
    fn current_staff_load_does_not_drive_actions() {
        let volume = history(&[2.0, 2.0]);
        let mut input = inputs(&volume, 10);
        input.workforce = WorkforceCapacity::new(10, 99.0);
        let forecast = CapacityPredictor::default().predict(&input, now());
        assert_eq!(kinds(&forecast), vec![(ActionKind::Training, Urgency::Low)]);
    }

    #[test]
    fn idle_period_is_zero_utilization() {
        let volume = history(&[0.0, 0.0, 0.0]);
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 0), now());
        assert_eq!(forecast.utilization_pct, 0.0);
        assert!(forecast.risks.is_empty());
    }

    #[test]
    fn forecast_days_are_clamped() {
        // strong growth: later forecasts would exceed 3× the last value
        let volume = history(&[1.0, 5.0, 20.0, 60.0, 200.0]);
        let last = volume.last_value().unwrap();
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 50), now());
        assert!(forecast.predicted_volume <= last * 3.0 * 7.0 + 1e-9);
        assert!(forecast.predicted_volume >= last * 0.5 * 7.0 - 1e-9);
    }

    #[test]
    fn spare_capacity_suggests_training() {
        let volume = history(&[2.0, 2.0, 2.0]);
        let forecast = CapacityPredictor::default().predict(&inputs(&volume, 10), now());
        assert!(forecast.utilization_pct < 60.0);
        assert!(forecast.staffing_gap_hours < 0.0);
        assert_eq!(forecast.recommended_actions.len(), 1);
        assert_eq!(forecast.recommended_actions[0].kind, ActionKind::Training);
        assert_eq!(forecast.recommended_actions[0].urgency, Urgency::Low);
    }

    #[test]
    fn confidence_rules() {
        let long: Vec<f64> = (0..40).map(|i| 20.0 + f64::from((i + 1) % 2)).collect();
        let volume = history(&long);
        assert_eq!(volume.direction, TrendDirection::Stable);
        let mut input = inputs(&volume, 5);
        input.historical_samples = 500;
        // 0.5 + 0.2 + 0.15 + 0.1, capped
        assert_eq!(confidence(&input), 0.95);

        let short = history(&[5.0, 10.0]);
        let mut input = inputs(&short, 5);
        input.resolution_variance = 200.0;
        // 0.5 - 0.1, trend increasing
        assert!((confidence(&input) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn weekend_days_are_not_working_days() {
        let predictor = CapacityPredictor::new(WorkCalendar {
            days_per_week: 5,
            hours_per_day: 10.0,
            effective_capacity: 1.0,
        });
        let volume = history(&[1.0, 1.0]);
        let forecast = predictor.predict(&inputs(&volume, 1), now());
        assert!((forecast.available_hours - 50.0).abs() < 1e-9);
    }
}
