//! Error types for the analytics engine
//!
//! Input errors (`InvalidRange`, `UnsupportedMetric`) are returned as soon as
//! they are seen. Upstream errors only surface from operations that have no
//! fallback; everywhere else they are logged and replaced with defaults.

use crate::config::ConfigError;
use pulse_facts::{RangeError, SourceError, UnsupportedMetric};
use pulse_series::SeriesError;
use std::time::Duration;

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Main analytics error type
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Period bounds are inverted or unparseable
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    /// Metric name not recognized
    #[error(transparent)]
    UnsupportedMetric(#[from] UnsupportedMetric),

    /// Not enough history for a strict computation
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Upstream provider failed
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream provider did not answer in time
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Computed series violated its ordering invariants
    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

impl AnalyticsError {
    /// Create upstream error
    #[inline]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Create timeout error
    #[inline]
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::Timeout { .. })
    }

    /// Check if error was caused by the caller's input
    #[inline]
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidRange(_) | Self::UnsupportedMetric(_))
    }
}

impl From<SourceError> for AnalyticsError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout { millis } => Self::Timeout {
                operation: "fact query".to_string(),
                millis,
            },
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}
