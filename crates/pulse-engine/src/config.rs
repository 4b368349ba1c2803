//! Engine configuration
//!
//! Every key is optional in TOML; missing keys take the defaults below.
//!
//! ```toml
//! cache_ttl_secs = 300
//! query_timeout_ms = 5000
//! default_period_days = 30
//! trend_window_days = 90
//! forecast_horizon = 7
//!
//! [work_calendar]
//! days_per_week = 5
//! hours_per_day = 8.0
//! effective_capacity = 0.8
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Could not render config as TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Working time assumed when turning headcount into hours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkCalendar {
    /// Working weekdays counted from Monday
    pub days_per_week: u32,
    pub hours_per_day: f64,
    /// Share of paid hours spent on tickets, in `(0, 1]`
    pub effective_capacity: f64,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            days_per_week: 5,
            hours_per_day: 8.0,
            effective_capacity: 0.8,
        }
    }
}

impl WorkCalendar {
    /// Ticket hours one technician delivers per working day
    #[inline]
    #[must_use]
    pub fn effective_hours_per_day(&self) -> f64 {
        self.hours_per_day * self.effective_capacity
    }
}

/// Analytics engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dashboard snapshot lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Bound on every upstream call in milliseconds
    pub query_timeout_ms: u64,
    /// Dashboard window when no period is given
    pub default_period_days: u32,
    /// History used for capacity forecasting
    pub trend_window_days: u32,
    /// Buckets projected by trend analysis
    pub forecast_horizon: u32,
    pub work_calendar: WorkCalendar,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            query_timeout_ms: 5000,
            default_period_days: 30,
            trend_window_days: 90,
            forecast_horizon: 7,
            work_calendar: WorkCalendar::default(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - `ConfigError::Invalid` when a value is out of range
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file cannot be read
    /// - otherwise as [`EngineConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// - `ConfigError::Serialize` if rendering fails
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::invalid("query_timeout_ms", "must be positive"));
        }
        if self.default_period_days == 0 {
            return Err(ConfigError::invalid("default_period_days", "must be positive"));
        }
        if self.trend_window_days == 0 {
            return Err(ConfigError::invalid("trend_window_days", "must be positive"));
        }
        let cal = &self.work_calendar;
        if !(1..=7).contains(&cal.days_per_week) {
            return Err(ConfigError::invalid("work_calendar.days_per_week", "must be 1..=7"));
        }
        if !(cal.hours_per_day > 0.0 && cal.hours_per_day <= 24.0) {
            return Err(ConfigError::invalid("work_calendar.hours_per_day", "must be in (0, 24]"));
        }
        if !(cal.effective_capacity > 0.0 && cal.effective_capacity <= 1.0) {
            return Err(ConfigError::invalid("work_calendar.effective_capacity", "must be in (0, 1]"));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[inline]
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// With upstream query timeout
    #[inline]
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With default dashboard window
    #[inline]
    #[must_use]
    pub fn with_default_period_days(mut self, days: u32) -> Self {
        self.default_period_days = days;
        self
    }

    /// With capacity history window
    #[inline]
    #[must_use]
    pub fn with_trend_window_days(mut self, days: u32) -> Self {
        self.trend_window_days = days;
        self
    }

    /// With forecast horizon
    #[inline]
    #[must_use]
    pub fn with_forecast_horizon(mut self, horizon: u32) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    /// With work calendar
    #[inline]
    #[must_use]
    pub fn with_work_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.work_calendar = calendar;
        self
    }
}
