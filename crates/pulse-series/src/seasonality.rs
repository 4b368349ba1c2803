//! Seasonality detection by autocorrelation at the cycle lag

use crate::sample::{values, MetricSample};
use crate::stats::mean;
use pulse_facts::Granularity;
use serde::{Deserialize, Serialize};

/// Cycle a seasonal signal repeats on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPattern {
    /// Repeats every 24 hourly buckets
    Daily,
    /// Repeats every 7 daily buckets
    Weekly,
    /// Repeats every 4 weekly buckets
    Monthly,
    /// Repeats every 12 monthly buckets
    Yearly,
}

impl SeasonalPattern {
    /// Pattern looked for at a given bucket granularity
    #[must_use]
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Hourly => Self::Daily,
            Granularity::Daily => Self::Weekly,
            Granularity::Weekly => Self::Monthly,
            Granularity::Monthly => Self::Yearly,
        }
    }
}

/// A detected cyclical pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalitySignal {
    pub pattern: SeasonalPattern,
    /// Autocorrelation at the cycle lag, capped at 1
    pub strength: f64,
    /// Lag in buckets
    pub lag: usize,
}

/// Stateless seasonality detector
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalityDetector;

impl SeasonalityDetector {
    /// Autocorrelation must exceed this to count as seasonal
    pub const SIGNIFICANCE: f64 = 0.3;

    /// Detect seasonality in `samples` bucketed at `granularity`
    ///
    /// Returns `None` with fewer than two full cycles, for a constant
    /// series, or when the autocorrelation is not significant.
    #[must_use]
    pub fn detect(samples: &[MetricSample], granularity: Granularity) -> Option<SeasonalitySignal> {
        let lag = granularity.cycle_length();
        if samples.len() < lag * 2 {
            tracing::trace!(n = samples.len(), lag, "not enough cycles for seasonality");
            return None;
        }

        let rho = autocorrelation(&values(samples), lag)?;
        if rho > Self::SIGNIFICANCE {
            Some(SeasonalitySignal {
                pattern: SeasonalPattern::for_granularity(granularity),
                strength: rho.min(1.0),
                lag,
            })
        } else {
            None
        }
    }
}

/// Sample autocorrelation at `lag`
///
/// `ρ(lag) = Σ(v[i]-μ)(v[i+lag]-μ) / Σ(v[i]-μ)²`. Returns `None` when the
/// lag does not fit in the series or the series has no variance.
#[must_use]
pub fn autocorrelation(values: &[f64], lag: usize) -> Option<f64> {
    if lag == 0 || lag >= values.len() {
        return None;
    }
    let mu = mean(values);
    let denominator: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    if denominator == 0.0 {
        return None;
    }
    let numerator: f64 = values
        .iter()
        .zip(values.iter().skip(lag))
        .map(|(a, b)| (a - mu) * (b - mu))
        .sum();
    Some(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<MetricSample> {
        let base = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricSample::new(base + Duration::days(i as i64), *v))
            .collect()
    }

    fn weekly_shape(cycles: usize) -> Vec<f64> {
        let week = [40.0, 38.0, 35.0, 36.0, 30.0, 8.0, 5.0];
        week.iter().copied().cycle().take(7 * cycles).collect()
    }

    #[test]
    fn repeating_week_is_strongly_weekly() {
        let signal = SeasonalityDetector::detect(&series(&weekly_shape(4)), Granularity::Daily).unwrap();
        assert_eq!(signal.pattern, SeasonalPattern::Weekly);
        assert_eq!(signal.lag, 7);
        // Three of four cycles overlap at lag 7, so ρ approaches 0.75 for n = 28
        // and tends to 1 as cycles grow; "close to 1" relative to the threshold.
        assert!(signal.strength > 0.7, "strength {}", signal.strength);
        assert!(signal.strength <= 1.0);
    }

    #[test]
    fn strength_grows_with_cycles() {
        let short = SeasonalityDetector::detect(&series(&weekly_shape(4)), Granularity::Daily).unwrap();
        let long = SeasonalityDetector::detect(&series(&weekly_shape(20)), Granularity::Daily).unwrap();
        assert!(long.strength > short.strength);
        assert!(long.strength > 0.9);
    }

    #[test]
    fn requires_two_cycles() {
        let values = weekly_shape(2);
        assert!(SeasonalityDetector::detect(&series(&values[..13]), Granularity::Daily).is_none());
        assert!(SeasonalityDetector::detect(&series(&values), Granularity::Daily).is_some());
    }

    #[test]
    fn constant_series_has_no_signal() {
        assert!(SeasonalityDetector::detect(&series(&[5.0; 30]), Granularity::Daily).is_none());
    }

    #[test]
    fn alternating_series_is_not_weekly() {
        let values: Vec<f64> = (0..28).map(|i| if i % 2 == 0 { 10.0 } else { 0.0 }).collect();
        // Odd lag on a period-2 signal is anti-correlated.
        assert!(SeasonalityDetector::detect(&series(&values), Granularity::Daily).is_none());
    }

    #[test]
    fn pattern_follows_granularity() {
        assert_eq!(SeasonalPattern::for_granularity(Granularity::Hourly), SeasonalPattern::Daily);
        assert_eq!(SeasonalPattern::for_granularity(Granularity::Weekly), SeasonalPattern::Monthly);
        assert_eq!(SeasonalPattern::for_granularity(Granularity::Monthly), SeasonalPattern::Yearly);
    }

    #[test]
    fn autocorrelation_edge_cases() {
        assert_eq!(autocorrelation(&[1.0, 2.0], 0), None);
        assert_eq!(autocorrelation(&[1.0, 2.0], 2), None);
        assert!(autocorrelation(&[1.0, 2.0, 1.0, 2.0], 2).unwrap() > 0.0);
    }
}
