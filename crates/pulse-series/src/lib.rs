//! Pulse Series
//!
//! Pure, deterministic algorithms over bucketed metric samples.
//!
//! # Core Operations
//!
//! - **Trend**: OLS slope plus endpoint percentage change → [`TrendDirection`]
//! - **Seasonality**: autocorrelation at the cycle lag → [`SeasonalitySignal`]
//! - **Forecast**: exponential smoothing + trend extrapolation → [`ForecastPoint`]
//!
//! # Architecture
//!
//! ```text
//! MetricSample[] ──► TrendAnalyzer ─────────┐
//!        │                                  ├──► TrendResult
//!        ├────────► SeasonalityDetector ────┤
//!        └────────► Forecaster ─────────────┘
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod forecast;
pub mod result;
pub mod sample;
pub mod seasonality;
pub mod stats;
pub mod trend;

pub use forecast::{ForecastPoint, Forecaster};
pub use result::TrendResult;
pub use sample::{MetricSample, SeriesError};
pub use seasonality::{SeasonalPattern, SeasonalityDetector, SeasonalitySignal};
pub use trend::{TrendAnalyzer, TrendDirection, TrendSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with series
    pub use crate::{
        ForecastPoint, Forecaster, MetricSample, SeasonalityDetector, SeasonalitySignal,
        TrendAnalyzer, TrendDirection, TrendResult,
    };
}
