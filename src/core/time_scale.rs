//! Sampling granularity and calendar spans.
//!
//! A [`TimeScale`] is the inferred sampling unit of a series (second through
//! year). A [`CalendarSpan`] such as `"2 weeks"` or `"3 months"` partitions a
//! timestamp index into calendar buckets, which is how span strings are turned
//! into observation counts.

use crate::error::{AnomalyError, Result};
use crate::utils::stats::median;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Inferred sampling granularity of a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeScale {
    /// All scales, finest first.
    pub const ALL: [TimeScale; 8] = [
        TimeScale::Second,
        TimeScale::Minute,
        TimeScale::Hour,
        TimeScale::Day,
        TimeScale::Week,
        TimeScale::Month,
        TimeScale::Quarter,
        TimeScale::Year,
    ];

    /// Smallest median gap (in seconds) that maps to this scale.
    fn lower_bound_seconds(self) -> f64 {
        match self {
            TimeScale::Second => 0.0,
            TimeScale::Minute => SECONDS_PER_MINUTE as f64,
            TimeScale::Hour => SECONDS_PER_HOUR as f64,
            TimeScale::Day => SECONDS_PER_DAY as f64,
            TimeScale::Week => SECONDS_PER_WEEK as f64,
            TimeScale::Month => (28 * SECONDS_PER_DAY) as f64,
            TimeScale::Quarter => (89 * SECONDS_PER_DAY) as f64,
            TimeScale::Year => (365 * SECONDS_PER_DAY) as f64,
        }
    }

    /// Classify a median gap between consecutive observations.
    pub fn from_gap_seconds(gap: f64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|scale| gap >= scale.lower_bound_seconds())
            .unwrap_or(TimeScale::Second)
    }

    /// Infer the scale of a timestamp index from its median spacing.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Result<Self> {
        if timestamps.len() < 2 {
            return Err(AnomalyError::InsufficientData {
                needed: 2,
                got: timestamps.len(),
            });
        }
        let gaps: Vec<f64> = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
            .collect();
        Ok(Self::from_gap_seconds(median(&gaps)))
    }

    /// The next finer scale, if any.
    pub fn finer(self) -> Option<Self> {
        let pos = Self::ALL.iter().position(|s| *s == self)?;
        pos.checked_sub(1).map(|p| Self::ALL[p])
    }

    /// Lowercase unit name, e.g. `"day"`.
    pub fn unit_name(self) -> &'static str {
        match self {
            TimeScale::Second => "second",
            TimeScale::Minute => "minute",
            TimeScale::Hour => "hour",
            TimeScale::Day => "day",
            TimeScale::Week => "week",
            TimeScale::Month => "month",
            TimeScale::Quarter => "quarter",
            TimeScale::Year => "year",
        }
    }

    /// Unit name pluralised for a count.
    pub fn unit_label(self, count: f64) -> String {
        if (count - 1.0).abs() < f64::EPSILON {
            self.unit_name().to_string()
        } else {
            format!("{}s", self.unit_name())
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

impl FromStr for TimeScale {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = s.trim().to_ascii_lowercase();
        let scale = match unit.as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => TimeScale::Second,
            "min" | "mins" | "minute" | "minutes" => TimeScale::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" => TimeScale::Hour,
            "d" | "day" | "days" => TimeScale::Day,
            "w" | "wk" | "wks" | "week" | "weeks" => TimeScale::Week,
            "mon" | "month" | "months" => TimeScale::Month,
            "q" | "qtr" | "quarter" | "quarters" => TimeScale::Quarter,
            "y" | "yr" | "yrs" | "year" | "years" => TimeScale::Year,
            _ => {
                return Err(AnomalyError::Unsupported(format!(
                    "time unit `{}`",
                    s.trim()
                )))
            }
        };
        Ok(scale)
    }
}

/// A calendar-based span such as `"1 week"` or `"3 months"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarSpan {
    count: u32,
    unit: TimeScale,
}

impl CalendarSpan {
    /// Create a span of `count` units.
    pub fn new(count: u32, unit: TimeScale) -> Result<Self> {
        if count == 0 {
            return Err(AnomalyError::InvalidParameter(
                "calendar span count must be positive".to_string(),
            ));
        }
        Ok(Self { count, unit })
    }

    /// Span from known-positive constants.
    pub(crate) const fn from_parts(count: u32, unit: TimeScale) -> Self {
        Self { count, unit }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> TimeScale {
        self.unit
    }

    /// Bucket key of a timestamp relative to the index's first timestamp.
    fn bucket_key(&self, anchor: &DateTime<Utc>, t: &DateTime<Utc>) -> i64 {
        let count = i64::from(self.count);
        match self.unit {
            TimeScale::Second | TimeScale::Minute | TimeScale::Hour | TimeScale::Day => {
                let unit = match self.unit {
                    TimeScale::Second => 1,
                    TimeScale::Minute => SECONDS_PER_MINUTE,
                    TimeScale::Hour => SECONDS_PER_HOUR,
                    _ => SECONDS_PER_DAY,
                };
                let start = anchor.timestamp().div_euclid(unit) * unit;
                (t.timestamp() - start).div_euclid(unit * count)
            }
            TimeScale::Week => {
                let start = anchor.timestamp().div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY;
                (t.timestamp() - start).div_euclid(SECONDS_PER_WEEK * count)
            }
            TimeScale::Month | TimeScale::Quarter | TimeScale::Year => {
                let months = match self.unit {
                    TimeScale::Month => count,
                    TimeScale::Quarter => 3 * count,
                    _ => 12 * count,
                };
                let start = if self.unit == TimeScale::Year {
                    let year = i64::from(anchor.year());
                    (year - year.rem_euclid(count)) * 12
                } else if 12 % months == 0 {
                    let month0 = i64::from(anchor.month0());
                    i64::from(anchor.year()) * 12 + month0 - month0 % months
                } else {
                    month_index(anchor)
                };
                (month_index(t) - start).div_euclid(months)
            }
        }
    }

    /// Number of observations falling into each non-empty bucket, in time order.
    pub fn bucket_counts(&self, timestamps: &[DateTime<Utc>]) -> Vec<usize> {
        let Some(anchor) = timestamps.first() else {
            return Vec::new();
        };

        let mut counts: Vec<usize> = Vec::new();
        let mut current: Option<i64> = None;
        for t in timestamps {
            let key = self.bucket_key(anchor, t);
            if current == Some(key) {
                if let Some(last) = counts.last_mut() {
                    *last += 1;
                }
            } else {
                counts.push(1);
                current = Some(key);
            }
        }
        counts
    }

    /// Median number of observations per bucket.
    pub fn median_observations(&self, timestamps: &[DateTime<Utc>]) -> f64 {
        let counts: Vec<f64> = self
            .bucket_counts(timestamps)
            .into_iter()
            .map(|c| c as f64)
            .collect();
        median(&counts)
    }
}

fn month_index(t: &DateTime<Utc>) -> i64 {
    i64::from(t.year()) * 12 + i64::from(t.month0())
}

impl fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.count,
            self.unit.unit_label(f64::from(self.count))
        )
    }
}

impl FromStr for CalendarSpan {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(digits_end);

        if unit.trim().is_empty() {
            return Err(AnomalyError::InvalidParameter(format!(
                "calendar span `{}` has no unit",
                trimmed
            )));
        }

        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| {
                AnomalyError::InvalidParameter(format!("calendar span `{}` count", trimmed))
            })?
        };
        Self::new(count, unit.parse()?)
    }
}

impl TryFrom<String> for CalendarSpan {
    type Error = AnomalyError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalendarSpan> for String {
    fn from(span: CalendarSpan) -> Self {
        span.to_string()
    }
}
