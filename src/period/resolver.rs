//! Frequency and trend resolution.
//!
//! Turns a [`PeriodSpec`] into a number of observations for a specific time
//! index. Calendar spans are resolved by bucketing the index and taking the
//! median bucket size; `auto` looks the span up in a [`ScaleTemplate`] and
//! falls back to shorter spans when the series is too short to support it.

use crate::core::{CalendarSpan, TimeScale, TimeSeries};
use crate::error::{AnomalyError, Result};
use crate::period::ScaleTemplate;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How a frequency or trend window is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodSpec {
    /// Look the span up in the scale template.
    #[default]
    Auto,
    /// A calendar span such as `"2 weeks"`.
    Span(CalendarSpan),
    /// A raw observation count.
    Observations(usize),
}

impl FromStr for PeriodSpec {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(PeriodSpec::Auto);
        }
        if let Ok(count) = trimmed.parse::<usize>() {
            return Ok(PeriodSpec::Observations(count));
        }
        trimmed.parse().map(PeriodSpec::Span)
    }
}

impl From<usize> for PeriodSpec {
    fn from(count: usize) -> Self {
        PeriodSpec::Observations(count)
    }
}

impl From<CalendarSpan> for PeriodSpec {
    fn from(span: CalendarSpan) -> Self {
        PeriodSpec::Span(span)
    }
}

impl fmt::Display for PeriodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodSpec::Auto => f.write_str("auto"),
            PeriodSpec::Span(span) => write!(f, "{}", span),
            PeriodSpec::Observations(count) => write!(f, "{}", count),
        }
    }
}

/// Which window is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodTarget {
    Frequency,
    Trend,
}

impl fmt::Display for PeriodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodTarget::Frequency => f.write_str("frequency"),
            PeriodTarget::Trend => f.write_str("trend"),
        }
    }
}

/// Resolves period specifications against a time index.
#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver<'a> {
    template: &'a ScaleTemplate,
    message: bool,
}

impl<'a> PeriodResolver<'a> {
    pub fn new(template: &'a ScaleTemplate) -> Self {
        Self {
            template,
            message: false,
        }
    }

    /// Emit the resolved count at `info` level instead of `debug`.
    pub fn with_message(mut self, message: bool) -> Self {
        self.message = message;
        self
    }

    /// Resolve `spec` to a number of observations.
    ///
    /// The result is the median bucket size and can be fractional when the
    /// number of buckets is even.
    pub fn resolve(
        &self,
        timestamps: &[DateTime<Utc>],
        spec: &PeriodSpec,
        target: PeriodTarget,
    ) -> Result<f64> {
        let resolved = match spec {
            PeriodSpec::Observations(0) => {
                return Err(AnomalyError::InvalidParameter(format!(
                    "{} must be a positive number of observations",
                    target
                )))
            }
            PeriodSpec::Observations(count) => *count as f64,
            PeriodSpec::Span(span) => {
                if timestamps.is_empty() {
                    return Err(AnomalyError::EmptyData);
                }
                span.median_observations(timestamps)
            }
            PeriodSpec::Auto => self.resolve_auto(timestamps, target)?,
        };

        self.report(timestamps, target, resolved);
        Ok(resolved)
    }

    fn resolve_auto(&self, timestamps: &[DateTime<Utc>], target: PeriodTarget) -> Result<f64> {
        let n = timestamps.len() as f64;
        let scale = TimeScale::infer(timestamps)?;
        let span = self.template.span(scale, target).ok_or_else(|| {
            AnomalyError::InvalidInput(format!(
                "time scale template has no entry for `{}`",
                scale
            ))
        })?;
        let fallback = self.template.fallback_span(scale, target);

        let resolved = match target {
            PeriodTarget::Frequency => {
                let mut freq = span.median_observations(timestamps);
                if n < 3.0 * freq {
                    debug!(span = %span, freq, "frequency span exceeds a third of the series");
                    freq = fallback.map_or(1.0, |s| s.median_observations(timestamps));
                    if n < 3.0 * freq {
                        debug!(freq, "fallback frequency insufficient, using 1");
                        freq = 1.0;
                    }
                }
                freq
            }
            PeriodTarget::Trend => {
                let mut trend = span.median_observations(timestamps);
                if n / trend < 2.0 {
                    debug!(span = %span, trend, "trend span exceeds half of the series");
                    trend = fallback.map_or(n, |s| s.median_observations(timestamps).ceil());
                    if n / trend < 2.0 {
                        debug!(trend, "fallback trend insufficient, spanning the whole series");
                        trend = n;
                    }
                }
                trend
            }
        };
        Ok(resolved)
    }

    fn report(&self, timestamps: &[DateTime<Utc>], target: PeriodTarget, observations: f64) {
        let unit = TimeScale::infer(timestamps)
            .map(|scale| scale.unit_label(observations))
            .unwrap_or_else(|_| "observations".to_string());
        if self.message {
            info!(%target, observations, unit = %unit, "{} = {} {}", target, observations, unit);
        } else {
            debug!(%target, observations, unit = %unit, "resolved period");
        }
    }
}

/// Resolve the seasonal frequency of a series as an observation count.
///
/// Fractional medians are truncated.
pub fn time_frequency(
    series: &TimeSeries,
    period: &PeriodSpec,
    template: &ScaleTemplate,
    message: bool,
) -> Result<usize> {
    let freq = PeriodResolver::new(template)
        .with_message(message)
        .resolve(series.timestamps(), period, PeriodTarget::Frequency)?;
    Ok(freq.trunc() as usize)
}

/// Resolve the trend window of a series as an observation count.
///
/// Fractional medians are rounded to the nearest count, halves to even.
pub fn time_trend(
    series: &TimeSeries,
    period: &PeriodSpec,
    template: &ScaleTemplate,
    message: bool,
) -> Result<usize> {
    let trend = PeriodResolver::new(template)
        .with_message(message)
        .resolve(series.timestamps(), period, PeriodTarget::Trend)?;
    Ok(trend.round_ties_even() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn daily_series(n: usize) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| base + Duration::days(i as i64)).collect();
        TimeSeries::univariate(timestamps, vec![1.0; n]).unwrap()
    }

    #[test]
    fn parses_period_specs() {
        assert_eq!("auto".parse::<PeriodSpec>().unwrap(), PeriodSpec::Auto);
        assert_eq!("12".parse::<PeriodSpec>().unwrap(), PeriodSpec::Observations(12));
        assert_eq!(
            "2 weeks".parse::<PeriodSpec>().unwrap(),
            PeriodSpec::Span("2 weeks".parse().unwrap())
        );
        assert!("2 eons".parse::<PeriodSpec>().is_err());
        assert_eq!(PeriodSpec::from(5).to_string(), "5");
    }

    #[test]
    fn auto_resolves_weekly_frequency_and_quarterly_trend() {
        let ts = daily_series(425);
        let template = ScaleTemplate::default();
        assert_eq!(time_frequency(&ts, &PeriodSpec::Auto, &template, true).unwrap(), 7);
        assert_eq!(time_trend(&ts, &PeriodSpec::Auto, &template, true).unwrap(), 91);
    }

    #[test]
    fn explicit_spans_and_counts() {
        let ts = daily_series(425);
        let template = ScaleTemplate::default();
        let thirty_days: PeriodSpec = "30 days".parse().unwrap();
        assert_eq!(time_trend(&ts, &thirty_days, &template, false).unwrap(), 30);
        assert_eq!(
            time_frequency(&ts, &PeriodSpec::Observations(5), &template, false).unwrap(),
            5
        );
    }

    #[test]
    fn short_series_trend_falls_back_to_finer_span() {
        let ts = daily_series(60);
        let template = ScaleTemplate::default();
        assert_eq!(time_trend(&ts, &PeriodSpec::Auto, &template, false).unwrap(), 28);
    }

    #[test]
    fn short_series_frequency_falls_back_to_one() {
        // 14 days: a week needs 21 rows; the day span yields 1.
        let ts = daily_series(14);
        let template = ScaleTemplate::default();
        assert_eq!(time_frequency(&ts, &PeriodSpec::Auto, &template, false).unwrap(), 1);
    }

    #[test]
    fn tiny_series_trend_spans_everything() {
        let ts = daily_series(20);
        let template = ScaleTemplate::default();
        // "3 months" -> 20 (insufficient), "1 month" -> 20 (insufficient) -> n
        assert_eq!(time_trend(&ts, &PeriodSpec::Auto, &template, false).unwrap(), 20);
    }

    #[test]
    fn fractional_medians_are_kept_by_resolver() {
        let base = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<_> = (0..10).map(|i| base + Duration::days(i)).collect();
        let template = ScaleTemplate::default();

        // buckets: 3, 3, 3, 1
        let span: CalendarSpan = "3 days".parse().unwrap();
        let resolved = PeriodResolver::new(&template)
            .resolve(&timestamps, &PeriodSpec::Span(span), PeriodTarget::Trend)
            .unwrap();
        assert_relative_eq!(resolved, 3.0);

        // buckets: 4, 3
        let span: CalendarSpan = "4 days".parse().unwrap();
        let resolved = PeriodResolver::new(&template)
            .resolve(&timestamps[..7], &PeriodSpec::Span(span), PeriodTarget::Trend)
            .unwrap();
        assert_relative_eq!(resolved, 3.5);
    }

    #[test]
    fn trend_rounds_half_to_even() {
        let template = ScaleTemplate::default();

        // November and December 2017: buckets 30, 31
        let base = Utc.with_ymd_and_hms(2017, 11, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<_> = (0..61).map(|i| base + Duration::days(i)).collect();
        let ts = TimeSeries::univariate(timestamps, vec![1.0; 61]).unwrap();
        let month: PeriodSpec = "1 month".parse().unwrap();
        assert_eq!(time_trend(&ts, &month, &template, false).unwrap(), 30);

        // buckets: 4, 3
        let ts = daily_series(7);
        let span: PeriodSpec = "4 days".parse().unwrap();
        assert_eq!(time_trend(&ts, &span, &template, false).unwrap(), 4);
    }

    #[test]
    fn custom_template_changes_auto() {
        let ts = daily_series(425);
        let template = ScaleTemplate::default().with_entry(
            TimeScale::Day,
            "2 weeks".parse().unwrap(),
            "30 days".parse().unwrap(),
        );
        assert_eq!(time_frequency(&ts, &PeriodSpec::Auto, &template, false).unwrap(), 14);
        assert_eq!(time_trend(&ts, &PeriodSpec::Auto, &template, false).unwrap(), 30);
    }

    #[test]
    fn rejects_invalid_requests() {
        let template = ScaleTemplate::default();
        let ts = daily_series(10);
        assert!(matches!(
            time_frequency(&ts, &PeriodSpec::Observations(0), &template, false),
            Err(AnomalyError::InvalidParameter(_))
        ));

        let single = daily_series(1);
        assert!(matches!(
            time_trend(&single, &PeriodSpec::Auto, &template, false),
            Err(AnomalyError::InsufficientData { needed: 2, got: 1 })
        ));

        let empty = TimeSeries::univariate(vec![], vec![]).unwrap();
        let span: PeriodSpec = "1 week".parse().unwrap();
        assert!(matches!(
            time_trend(&empty, &span, &template, false),
            Err(AnomalyError::EmptyData)
        ));

        assert!(matches!(
            time_trend(&ts, &PeriodSpec::Auto, &ScaleTemplate::empty(), false),
            Err(AnomalyError::InvalidInput(_))
        ));
    }
}
