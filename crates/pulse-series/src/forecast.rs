//! Short-horizon forecasting
//!
//! Single exponential smoothing followed by linear extrapolation of the
//! recent smoothed slope. Confidence decays with horizon and with the
//! variance of the history.

use crate::sample::{values, MetricSample};
use crate::stats::{index, variance};
use chrono::{DateTime, Utc};
use pulse_facts::Granularity;
use serde::{Deserialize, Serialize};

/// One projected bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    /// Never negative
    pub predicted_value: f64,
    /// In `[0, 1]`, non-increasing with horizon
    pub confidence: f64,
}

/// Exponential-smoothing forecaster
#[derive(Debug, Clone, Copy, Default)]
pub struct Forecaster;

impl Forecaster {
    /// Smoothing factor
    pub const ALPHA: f64 = 0.3;
    /// Minimum history length
    pub const MIN_POINTS: usize = 3;
    /// Smoothed points used to estimate the trend
    pub const TREND_WINDOW: usize = 5;
    /// Confidence floor before clamping
    pub const CONFIDENCE_FLOOR: f64 = 0.5;
    /// Confidence lost per step of horizon
    pub const DECAY_PER_STEP: f64 = 0.1;

    /// Project `horizon` buckets past the last sample
    ///
    /// Returns `None` with fewer than [`Self::MIN_POINTS`] samples.
    #[must_use]
    pub fn forecast(
        samples: &[MetricSample],
        horizon: u32,
        granularity: Granularity,
    ) -> Option<Vec<ForecastPoint>> {
        if samples.len() < Self::MIN_POINTS {
            return None;
        }
        let history = values(samples);
        let smoothed = smooth(&history, Self::ALPHA);
        let last = smoothed[smoothed.len() - 1];
        let trend = recent_trend(&smoothed, Self::TREND_WINDOW);
        let spread = variance(&history);
        let anchor = samples[samples.len() - 1].date;

        tracing::trace!(last, trend, spread, horizon, "forecasting");

        let points = (1..=horizon)
            .map(|step| {
                let i = f64::from(step);
                ForecastPoint {
                    date: granularity.advance(anchor, step),
                    predicted_value: (last + trend * i).max(0.0),
                    confidence: confidence(step, spread),
                }
            })
            .collect();
        Some(points)
    }
}

/// Single exponential smoothing seeded with the first value
#[must_use]
pub fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut level = match values.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(level);
    for v in &values[1..] {
        level = alpha * v + (1.0 - alpha) * level;
        out.push(level);
    }
    out
}

/// Mean first difference over the last `window` smoothed values
#[must_use]
pub fn recent_trend(smoothed: &[f64], window: usize) -> f64 {
    let take = window.min(smoothed.len());
    if take < 2 {
        return 0.0;
    }
    let tail = &smoothed[smoothed.len() - take..];
    (tail[take - 1] - tail[0]) / index(take - 1)
}

/// Confidence at horizon `step` for history variance `spread`
///
/// `max(0.5, 1 - 0.1·step - spread/100)`, clamped to `[0, 1]`.
#[must_use]
pub fn confidence(step: u32, spread: f64) -> f64 {
    let raw = 1.0 - Forecaster::DECAY_PER_STEP * f64::from(step) - spread / 100.0;
    raw.max(Forecaster::CONFIDENCE_FLOOR).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Vec<MetricSample> {
        let base = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricSample::new(base + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn needs_three_points() {
        assert!(Forecaster::forecast(&series(&[1.0, 2.0]), 3, Granularity::Daily).is_none());
        assert!(Forecaster::forecast(&series(&[1.0, 2.0, 3.0]), 3, Granularity::Daily).is_some());
    }

    #[test]
    fn smoothing_matches_recurrence() {
        let s = smooth(&[10.0, 20.0, 20.0], 0.3);
        assert_eq!(s[0], 10.0);
        assert!((s[1] - 13.0).abs() < 1e-12);
        assert!((s[2] - 15.1).abs() < 1e-12);
        assert!(smooth(&[], 0.3).is_empty());
    }

    #[test]
    fn trend_uses_last_five_smoothed() {
        let smoothed = [0.0, 100.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((recent_trend(&smoothed, 5) - 1.0).abs() < 1e-12);
        assert_eq!(recent_trend(&[7.0], 5), 0.0);
    }

    #[test]
    fn dates_follow_granularity() {
        let samples = series(&[5.0, 6.0, 7.0, 8.0]);
        let points = Forecaster::forecast(&samples, 3, Granularity::Weekly).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, samples[3].date + Duration::weeks(1));
        assert_eq!(points[2].date, samples[3].date + Duration::weeks(3));
    }

    #[test]
    fn steep_decline_clamps_at_zero() {
        let points = Forecaster::forecast(&series(&[100.0, 60.0, 20.0, 5.0, 0.0]), 10, Granularity::Daily).unwrap();
        assert!(points.iter().all(|p| p.predicted_value >= 0.0));
        assert_eq!(points[9].predicted_value, 0.0);
    }

    #[test]
    fn low_variance_confidence_decays_to_floor() {
        let points = Forecaster::forecast(&series(&[10.0, 10.0, 10.0]), 8, Granularity::Daily).unwrap();
        assert!((points[0].confidence - 0.9).abs() < 1e-12);
        assert!((points[4].confidence - 0.5).abs() < 1e-12);
        assert_eq!(points[7].confidence, 0.5);
    }

    #[test]
    fn zero_horizon_is_empty() {
        let points = Forecaster::forecast(&series(&[1.0, 2.0, 3.0]), 0, Granularity::Daily).unwrap();
        assert!(points.is_empty());
    }

    proptest! {
        #[test]
        fn confidence_never_increases(
            values in prop::collection::vec(0.0f64..500.0, 3..60),
            horizon in 1u32..30,
        ) {
            let points = Forecaster::forecast(&series(&values), horizon, Granularity::Daily).unwrap();
            for pair in points.windows(2) {
                prop_assert!(pair[1].confidence <= pair[0].confidence);
            }
            for p in &points {
                prop_assert!((0.0..=1.0).contains(&p.confidence));
            }
        }

        #[test]
        fn predictions_never_negative(
            values in prop::collection::vec(-50.0f64..500.0, 3..60),
            horizon in 1u32..30,
        ) {
            let points = Forecaster::forecast(&series(&values), horizon, Granularity::Daily).unwrap();
            prop_assert!(points.iter().all(|p| p.predicted_value >= 0.0));
        }
    }
}
