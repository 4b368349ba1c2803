//! Trend classification
//!
//! Fits an OLS line through the sample values (against bucket index) and
//! combines its slope with the first-to-last percentage change.

use crate::sample::{values, MetricSample};
use crate::stats::linear_regression;
use serde::{Deserialize, Serialize};

/// Overall direction of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Output of [`TrendAnalyzer::analyze`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    /// `(last - first) / first * 100`, `0` when `first == 0`
    pub percentage_change: f64,
    /// Change per bucket from the least-squares fit
    pub slope: f64,
    pub intercept: f64,
}

impl TrendSummary {
    fn flat(value: f64) -> Self {
        Self {
            direction: TrendDirection::Stable,
            percentage_change: 0.0,
            slope: 0.0,
            intercept: value,
        }
    }
}

/// Stateless trend classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// Changes strictly below this magnitude (percent) are stable
    pub const STABLE_BAND_PCT: f64 = 5.0;

    /// Classify a sample sequence
    ///
    /// Fewer than two samples are always stable with zero change.
    #[must_use]
    pub fn analyze(samples: &[MetricSample]) -> TrendSummary {
        if samples.len() < 2 {
            return TrendSummary::flat(samples.first().map_or(0.0, |s| s.value));
        }

        let series = values(samples);
        let (slope, intercept) = linear_regression(&series);
        let percentage_change = percentage_change(series[0], series[series.len() - 1]);

        let direction = if percentage_change.abs() < Self::STABLE_BAND_PCT {
            TrendDirection::Stable
        } else if slope > 0.0 {
            TrendDirection::Increasing
        } else if slope < 0.0 {
            TrendDirection::Decreasing
        } else if percentage_change > 0.0 {
            // Flat fit with a large endpoint move; follow the endpoints.
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        tracing::trace!(?direction, percentage_change, slope, "trend classified");

        TrendSummary {
            direction,
            percentage_change,
            slope,
            intercept,
        }
    }
}

/// Relative change from `first` to `last` in percent
#[inline]
#[must_use]
pub fn percentage_change(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        (last - first) * 100.0 / first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Vec<MetricSample> {
        let base: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricSample::new(base + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn short_series_is_stable() {
        assert_eq!(TrendAnalyzer::analyze(&[]).direction, TrendDirection::Stable);
        let one = TrendAnalyzer::analyze(&series(&[42.0]));
        assert_eq!(one.direction, TrendDirection::Stable);
        assert_eq!(one.percentage_change, 0.0);
    }

    #[test]
    fn exactly_five_percent_is_not_stable() {
        let summary = TrendAnalyzer::analyze(&series(&[100.0, 105.0]));
        assert_eq!(summary.percentage_change, 5.0);
        assert_eq!(summary.direction, TrendDirection::Increasing);
    }

    #[test]
    fn just_under_five_percent_is_stable() {
        let summary = TrendAnalyzer::analyze(&series(&[100.0, 104.99]));
        assert_eq!(summary.direction, TrendDirection::Stable);
    }

    #[test]
    fn rising_fifty_percent_over_ten_points() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + f64::from(i) * 50.0 / 9.0).collect();
        let summary = TrendAnalyzer::analyze(&series(&values));
        assert_eq!(summary.direction, TrendDirection::Increasing);
        assert!((summary.percentage_change - 50.0).abs() < 1e-9);
        assert!(summary.slope > 0.0);
    }

    #[test]
    fn falling_series_is_decreasing() {
        let summary = TrendAnalyzer::analyze(&series(&[80.0, 70.0, 60.0, 50.0]));
        assert_eq!(summary.direction, TrendDirection::Decreasing);
        assert!((summary.percentage_change + 37.5).abs() < 1e-9);
    }

    #[test]
    fn zero_first_value_means_zero_change() {
        let summary = TrendAnalyzer::analyze(&series(&[0.0, 10.0, 20.0]));
        assert_eq!(summary.percentage_change, 0.0);
        assert_eq!(summary.direction, TrendDirection::Stable);
    }

    #[test]
    fn flat_fit_follows_endpoints() {
        // Symmetric series: OLS slope is zero but endpoints differ by 10%.
        let summary = TrendAnalyzer::analyze(&series(&[100.0, 120.0, 90.0, 110.0]));
        assert!(summary.percentage_change >= 5.0);
        assert_ne!(summary.direction, TrendDirection::Stable);
    }

    proptest! {
        #[test]
        fn analysis_is_deterministic(values in prop::collection::vec(0.0f64..1000.0, 0..40)) {
            let samples = series(&values);
            prop_assert_eq!(TrendAnalyzer::analyze(&samples), TrendAnalyzer::analyze(&samples));
        }

        #[test]
        fn small_changes_are_stable(first in 1.0f64..1000.0, frac in -0.049f64..0.049) {
            let summary = TrendAnalyzer::analyze(&series(&[first, first * (1.0 + frac)]));
            prop_assert_eq!(summary.direction, TrendDirection::Stable);
        }
    }
}
