//! Bucketed metric samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors in a sample sequence
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    /// Dates are not strictly ascending
    #[error("samples out of order at index {index}")]
    Unsorted { index: usize },

    /// Two samples share a bucket
    #[error("duplicate sample date {date}")]
    Duplicate { date: DateTime<Utc> },

    /// A value is NaN or infinite
    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// One point per time bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Bucket start
    pub date: DateTime<Utc>,
    /// Measured value
    pub value: f64,
    /// Goal for the bucket, if one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl MetricSample {
    /// Create sample without target
    #[inline]
    #[must_use]
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self {
            date,
            value,
            target: None,
        }
    }

    /// With target value
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }
}

/// Check ordering, uniqueness and finiteness of a sequence
///
/// # Errors
/// - `SeriesError::Duplicate` when two adjacent samples share a date
/// - `SeriesError::Unsorted` when a date goes backwards
/// - `SeriesError::NonFinite` for NaN/infinite values
pub fn validate(samples: &[MetricSample]) -> Result<(), SeriesError> {
    for (index, sample) in samples.iter().enumerate() {
        if !sample.value.is_finite() {
            return Err(SeriesError::NonFinite { index });
        }
        if index > 0 {
            let prev = samples[index - 1].date;
            if sample.date == prev {
                return Err(SeriesError::Duplicate { date: sample.date });
            }
            if sample.date < prev {
                return Err(SeriesError::Unsorted { index });
            }
        }
    }
    Ok(())
}

/// Values of a sequence in order
#[inline]
#[must_use]
pub fn values(samples: &[MetricSample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}
