//! Composed trend report for one metric

use crate::forecast::{ForecastPoint, Forecaster};
use crate::sample::{validate, MetricSample, SeriesError};
use crate::seasonality::{SeasonalityDetector, SeasonalitySignal};
use crate::trend::{TrendAnalyzer, TrendDirection};
use pulse_facts::{DateRange, Granularity, Metric};
use serde::{Deserialize, Serialize};

/// Trend, seasonality and forecast for one metric over one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub metric: Metric,
    pub period: DateRange,
    pub granularity: Granularity,
    pub samples: Vec<MetricSample>,
    pub direction: TrendDirection,
    pub percentage_change: f64,
    pub slope: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<SeasonalitySignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<ForecastPoint>>,
}

impl TrendResult {
    /// Analyze `samples` and project `horizon` buckets ahead
    ///
    /// Seasonality and forecast are left empty when the history is too
    /// short for them.
    ///
    /// # Errors
    /// Any [`SeriesError`] from validating the samples.
    pub fn build(
        metric: Metric,
        period: DateRange,
        granularity: Granularity,
        samples: Vec<MetricSample>,
        horizon: u32,
    ) -> Result<Self, SeriesError> {
        validate(&samples)?;
        let summary = TrendAnalyzer::analyze(&samples);
        let seasonality = SeasonalityDetector::detect(&samples, granularity);
        let forecast = Forecaster::forecast(&samples, horizon, granularity);
        Ok(Self {
            metric,
            period,
            granularity,
            samples,
            direction: summary.direction,
            percentage_change: summary.percentage_change,
            slope: summary.slope,
            seasonality,
            forecast,
        })
    }

    /// Empty report used when the underlying series could not be fetched
    #[must_use]
    pub fn empty(metric: Metric, period: DateRange, granularity: Granularity) -> Self {
        Self {
            metric,
            period,
            granularity,
            samples: Vec::new(),
            direction: TrendDirection::Stable,
            percentage_change: 0.0,
            slope: 0.0,
            seasonality: None,
            forecast: None,
        }
    }

    /// Most recent observed value
    #[inline]
    #[must_use]
    pub fn last_value(&self) -> Option<f64> {
        self.samples.last().map(|s| s.value)
    }
}
