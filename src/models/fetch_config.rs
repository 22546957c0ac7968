use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;

use crate::constants::{DEFAULT_INTERVAL, MAX_DAYS_PER_CALL, RATE_LIMIT_DELAY_MS};

/// Candle time unit accepted by the historical-candle v3 API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl TimeUnit {
    /// Path segment used in API URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
        }
    }

    /// Parse from string (case-insensitive, singular or plural)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "hour" | "hours" => Ok(TimeUnit::Hours),
            "day" | "days" => Ok(TimeUnit::Days),
            "week" | "weeks" => Ok(TimeUnit::Weeks),
            "month" | "months" => Ok(TimeUnit::Months),
            _ => Err(format!(
                "Invalid unit: {}. Valid options: minutes, hours, days, weeks, months",
                s
            )),
        }
    }

    /// Check an interval value against the range this unit allows
    ///
    /// minutes: 1-300, hours: 1-5, days/weeks/months: 1
    pub fn validate_interval(&self, interval: u32) -> Result<(), String> {
        let (min, max) = match self {
            TimeUnit::Minutes => (1, 300),
            TimeUnit::Hours => (1, 5),
            TimeUnit::Days | TimeUnit::Weeks | TimeUnit::Months => (1, 1),
        };

        if interval < min || interval > max {
            return Err(format!(
                "Invalid interval {} for unit {}: must be between {} and {}",
                interval,
                self.as_str(),
                min,
                max
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for TimeUnit {
    fn default() -> Self {
        TimeUnit::Minutes
    }
}

/// Configuration for a historical fetch run
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// First day of history to request
    pub from_date: NaiveDate,

    /// End of the requested range (usually now)
    pub to: NaiveDateTime,

    pub unit: TimeUnit,

    pub interval: u32,

    /// Widest window per API call, in days
    pub max_days_per_call: i64,

    /// Pause after every API call
    pub rate_limit_delay: StdDuration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let now = Local::now().naive_local();
        Self {
            from_date: now.date(),
            to: now,
            unit: TimeUnit::Minutes,
            interval: DEFAULT_INTERVAL,
            max_days_per_call: MAX_DAYS_PER_CALL,
            rate_limit_delay: StdDuration::from_millis(RATE_LIMIT_DELAY_MS),
        }
    }
}

impl FetchConfig {
    /// Create config fetching from `from_date` up to now
    pub fn new(from_date: NaiveDate, unit: TimeUnit, interval: u32) -> Result<Self, String> {
        unit.validate_interval(interval)?;
        Ok(Self {
            from_date,
            unit,
            interval,
            ..Default::default()
        })
    }

    /// Date windows covering `from_date` (midnight) up to `to`
    pub fn date_ranges(&self) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let start = self.from_date.and_time(NaiveTime::default());
        generate_date_ranges(start, self.to, self.max_days_per_call)
    }
}

/// Split `[start, end)` into consecutive windows of at most `step_days` days
///
/// Each window is `(cur, min(cur + step_days, end))` and generation stops once
/// `cur` reaches `end`. Returns nothing when `start >= end`.
pub fn generate_date_ranges(
    start: NaiveDateTime,
    end: NaiveDateTime,
    step_days: i64,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let step = Duration::days(step_days.max(1));
    let mut ranges = Vec::new();
    let mut cur = start;

    while cur < end {
        let next = std::cmp::min(cur + step, end);
        ranges.push((cur, next));
        cur = next;
    }

    ranges
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {} (expected YYYY-MM-DD)", s.trim(), e))
}
