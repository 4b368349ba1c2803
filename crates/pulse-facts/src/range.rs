//! Date ranges and time bucketing
//!
//! Provides [`DateRange`] for scoping every query and [`Granularity`] for
//! grouping instants into fixed-width buckets.

use chrono::{DateTime, Datelike, Duration, DurationRound, Months, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Errors raised when building a [`DateRange`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// Start is after end
    #[error("invalid range: start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Granularity name not recognized
    #[error("unknown granularity: '{0}'")]
    UnknownGranularity(String),
}

/// Closed-open interval `[start, end)` of UTC instants
///
/// Invariant: `start <= end`. The only constructor that can fail is
/// [`DateRange::new`]; deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawRange> for DateRange {
    type Error = RangeError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl From<DateRange> for RawRange {
    fn from(range: DateRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

impl DateRange {
    /// Create new range
    ///
    /// # Errors
    /// - `RangeError::Inverted` if `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering the `days` days that end at `end`
    #[must_use]
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Range covering `days` days starting at `start`
    #[must_use]
    pub fn following_days(start: DateTime<Utc>, days: u32) -> Self {
        Self {
            start,
            end: start + Duration::days(i64::from(days)),
        }
    }

    /// Trailing window anchored at the start of the hour containing `now`
    ///
    /// Stable for a whole hour, so it can be used as a cache key for
    /// "the last N days" requests.
    #[must_use]
    pub fn hour_aligned_trailing(now: DateTime<Utc>, days: u32) -> Self {
        let end = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        Self::trailing_days(end, days)
    }

    /// Range start (inclusive)
    #[inline]
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Range end (exclusive)
    #[inline]
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the range
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Check if instant falls inside the range
    ///
    /// A zero-length range contains its single instant.
    #[inline]
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if self.start == self.end {
            return instant == self.start;
        }
        instant >= self.start && instant < self.end
    }

    /// Same-length window immediately before this one
    #[must_use]
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - self.duration(),
            end: self.start,
        }
    }

    /// Bounds truncated to whole minutes
    #[must_use]
    pub fn normalized(&self) -> Self {
        let trunc = |dt: DateTime<Utc>| dt.duration_trunc(Duration::minutes(1)).unwrap_or(dt);
        Self {
            start: trunc(self.start),
            end: trunc(self.end),
        }
    }

    /// Stable cache key derived from the normalized bounds
    #[must_use]
    pub fn cache_key(&self) -> String {
        let n = self.normalized();
        format!(
            "{}..{}",
            n.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            n.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Calendar dates touched by the range
    ///
    /// A date is included when any part of it lies inside `[start, end)`.
    #[must_use]
    pub fn calendar_days(&self) -> Vec<NaiveDate> {
        if self.start == self.end {
            return Vec::new();
        }
        let last = (self.end - Duration::nanoseconds(1)).date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// Bucket width for time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One bucket per hour
    Hourly,
    /// One bucket per UTC day
    Daily,
    /// One bucket per ISO week (Monday start)
    Weekly,
    /// One bucket per calendar month
    Monthly,
}

impl Granularity {
    /// Start of the bucket containing `instant`
    #[must_use]
    pub fn bucket_start(self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = |date: NaiveDate| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
        match self {
            Self::Hourly => instant.duration_trunc(Duration::hours(1)).unwrap_or(instant),
            Self::Daily => midnight(instant.date_naive()),
            Self::Weekly => {
                let date = instant.date_naive();
                let offset = i64::from(date.weekday().num_days_from_monday());
                midnight(date - Duration::days(offset))
            }
            Self::Monthly => {
                let date = instant.date_naive();
                midnight(date.with_day(1).unwrap_or(date))
            }
        }
    }

    /// Advance a bucket start by `steps` buckets
    #[must_use]
    pub fn advance(self, bucket: DateTime<Utc>, steps: u32) -> DateTime<Utc> {
        match self {
            Self::Hourly => bucket + Duration::hours(i64::from(steps)),
            Self::Daily => bucket + Duration::days(i64::from(steps)),
            Self::Weekly => bucket + Duration::weeks(i64::from(steps)),
            Self::Monthly => bucket
                .checked_add_months(Months::new(steps))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Every bucket start from the bucket of `range.start` to that of `range.end`
    ///
    /// For a range ending exactly on a bucket boundary, the trailing empty
    /// bucket is not included.
    #[must_use]
    pub fn buckets(self, range: &DateRange) -> Vec<DateTime<Utc>> {
        let last = if range.end > range.start {
            self.bucket_start(range.end - Duration::nanoseconds(1))
        } else {
            self.bucket_start(range.end)
        };
        let mut out = Vec::new();
        let mut cursor = self.bucket_start(range.start);
        while cursor <= last {
            out.push(cursor);
            cursor = self.advance(cursor, 1);
        }
        out
    }

    /// Number of buckets in one seasonal cycle
    #[inline]
    #[must_use]
    pub fn cycle_length(self) -> usize {
        match self {
            Self::Hourly => 24,
            Self::Daily => 7,
            Self::Weekly => 4,
            Self::Monthly => 12,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" | "hour" => Ok(Self::Hourly),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(RangeError::UnknownGranularity(other.to_string())),
        }
    }
}
