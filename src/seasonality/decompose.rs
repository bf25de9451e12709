//! Seasonal/trend decomposition of a single series.
//!
//! Two strategies share the same output shape:
//! - `stl`: robust STL with the resolved trend window; trend is the LOESS trend.
//! - `twitter`: robust STL supplies only the seasonal component; the trend is a
//!   step function of block medians (`median_spans`).

use crate::core::TimeSeries;
use crate::error::{AnomalyError, Result};
use crate::period::{PeriodResolver, PeriodSpec, PeriodTarget, ScaleTemplate};
use crate::seasonality::stl::{strength, SeasonalWindow, STL};
use crate::utils::stats::median;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Column labels written by [`Decomposition::to_time_series`].
pub mod columns {
    pub const OBSERVED: &str = "observed";
    pub const SEASON: &str = "season";
    pub const TREND: &str = "trend";
    pub const MEDIAN_SPANS: &str = "median_spans";
    pub const REMAINDER: &str = "remainder";
}

/// Decomposition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecomposeMethod {
    /// Seasonal + LOESS trend.
    #[default]
    Stl,
    /// Seasonal + piecewise median trend.
    Twitter,
}

impl FromStr for DecomposeMethod {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stl" => Ok(DecomposeMethod::Stl),
            "twitter" => Ok(DecomposeMethod::Twitter),
            other => Err(AnomalyError::Unsupported(format!(
                "decomposition method `{}` (expected `stl` or `twitter`)",
                other
            ))),
        }
    }
}

impl fmt::Display for DecomposeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecomposeMethod::Stl => f.write_str("stl"),
            DecomposeMethod::Twitter => f.write_str("twitter"),
        }
    }
}

/// The non-seasonal baseline of a decomposition.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendComponent {
    /// Smooth LOESS trend (`stl`).
    Loess(Vec<f64>),
    /// Block-median step function (`twitter`).
    MedianSpans(Vec<f64>),
}

impl TrendComponent {
    pub fn values(&self) -> &[f64] {
        match self {
            TrendComponent::Loess(v) | TrendComponent::MedianSpans(v) => v,
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            TrendComponent::Loess(_) => columns::TREND,
            TrendComponent::MedianSpans(_) => columns::MEDIAN_SPANS,
        }
    }

    pub fn method(&self) -> DecomposeMethod {
        match self {
            TrendComponent::Loess(_) => DecomposeMethod::Stl,
            TrendComponent::MedianSpans(_) => DecomposeMethod::Twitter,
        }
    }
}

/// Aligned decomposition columns for one series.
///
/// `observed = season + trend + remainder` holds row by row up to
/// floating-point rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    timestamps: Vec<DateTime<Utc>>,
    observed: Vec<f64>,
    season: Vec<f64>,
    trend: TrendComponent,
    remainder: Vec<f64>,
    frequency: Option<usize>,
    trend_window: Option<usize>,
}

impl Decomposition {
    /// Assemble a decomposition from aligned columns.
    pub fn from_parts(
        timestamps: Vec<DateTime<Utc>>,
        observed: Vec<f64>,
        season: Vec<f64>,
        trend: TrendComponent,
        remainder: Vec<f64>,
    ) -> Result<Self> {
        let n = timestamps.len();
        for len in [
            observed.len(),
            season.len(),
            trend.values().len(),
            remainder.len(),
        ] {
            if len != n {
                return Err(AnomalyError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }
        Ok(Self {
            timestamps,
            observed,
            season,
            trend,
            remainder,
            frequency: None,
            trend_window: None,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    pub fn season(&self) -> &[f64] {
        &self.season
    }

    pub fn trend(&self) -> &TrendComponent {
        &self.trend
    }

    pub fn remainder(&self) -> &[f64] {
        &self.remainder
    }

    pub fn method(&self) -> DecomposeMethod {
        self.trend.method()
    }

    /// Seasonal period used, when produced by [`time_decompose`].
    pub fn frequency(&self) -> Option<usize> {
        self.frequency
    }

    /// Trend window (`stl`) or median-span target length (`twitter`).
    pub fn trend_window(&self) -> Option<usize> {
        self.trend_window
    }

    /// `season + trend` (or `season + median_spans`) for every row.
    pub fn fitted(&self) -> Vec<f64> {
        self.season
            .iter()
            .zip(self.trend.values())
            .map(|(s, t)| s + t)
            .collect()
    }

    pub fn seasonal_strength(&self) -> f64 {
        strength(&self.season, &self.remainder)
    }

    pub fn trend_strength(&self) -> f64 {
        strength(self.trend.values(), &self.remainder)
    }

    /// Columns `observed, season, trend|median_spans, remainder`.
    pub fn to_time_series(&self) -> Result<TimeSeries> {
        TimeSeries::from_columns(
            self.timestamps.clone(),
            vec![
                (columns::OBSERVED.to_string(), self.observed.clone()),
                (columns::SEASON.to_string(), self.season.clone()),
                (
                    self.trend.column_name().to_string(),
                    self.trend.values().to_vec(),
                ),
                (columns::REMAINDER.to_string(), self.remainder.clone()),
            ],
        )
    }

    /// Append the decomposition columns to the series it was computed from.
    pub fn merge_into(&self, series: &TimeSeries) -> Result<TimeSeries> {
        if series.timestamps() != self.timestamps.as_slice() {
            return Err(AnomalyError::InvalidInput(
                "merge: series index differs from the decomposition index".to_string(),
            ));
        }
        series
            .clone()
            .with_column(columns::OBSERVED, self.observed.clone())?
            .with_column(columns::SEASON, self.season.clone())?
            .with_column(self.trend.column_name(), self.trend.values().to_vec())?
            .with_column(columns::REMAINDER, self.remainder.clone())
    }
}

/// Configuration for [`time_decompose`].
#[derive(Debug, Clone)]
pub struct DecomposeConfig {
    pub method: DecomposeMethod,
    /// Seasonal frequency request.
    pub frequency: PeriodSpec,
    /// Trend window request.
    pub trend: PeriodSpec,
    pub template: ScaleTemplate,
    /// Use robust STL fitting.
    pub robust: bool,
    /// Seasonal LOESS window passed to STL.
    pub seasonal_window: SeasonalWindow,
    /// STL low-pass span (nl); the period rounded to odd when unset.
    pub low_pass: Option<usize>,
    /// STL inner iterations; 1 when robust, 2 otherwise when unset.
    pub inner_iterations: Option<usize>,
    /// STL robustness iterations; 15 when robust when unset. Zero disables robustness.
    pub outer_iterations: Option<usize>,
    /// Report resolved periods at `info` level.
    pub message: bool,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            method: DecomposeMethod::Stl,
            frequency: PeriodSpec::Auto,
            trend: PeriodSpec::Auto,
            template: ScaleTemplate::default(),
            robust: true,
            seasonal_window: SeasonalWindow::Periodic,
            low_pass: None,
            inner_iterations: None,
            outer_iterations: None,
            message: false,
        }
    }
}

impl DecomposeConfig {
    pub fn stl() -> Self {
        Self::default()
    }

    pub fn twitter() -> Self {
        Self::default().with_method(DecomposeMethod::Twitter)
    }

    pub fn with_method(mut self, method: DecomposeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<PeriodSpec>) -> Self {
        self.frequency = frequency.into();
        self
    }

    pub fn with_trend(mut self, trend: impl Into<PeriodSpec>) -> Self {
        self.trend = trend.into();
        self
    }

    pub fn with_template(mut self, template: ScaleTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    /// Smooth each cycle-subseries with a LOESS span of `ns` cycles instead
    /// of forcing an identical pattern in every cycle.
    pub fn with_seasonal_window(mut self, ns: usize) -> Self {
        self.seasonal_window = SeasonalWindow::Span(ns);
        self
    }

    pub fn with_low_pass(mut self, nl: usize) -> Self {
        self.low_pass = Some(nl);
        self
    }

    pub fn with_inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = Some(n);
        self
    }

    pub fn with_outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = Some(n);
        self
    }

    pub fn with_message(mut self, message: bool) -> Self {
        self.message = message;
        self
    }

    fn build_stl(&self, frequency: usize) -> STL {
        let mut stl = STL::new(frequency);
        if self.robust {
            stl = stl.robust();
        }
        if let SeasonalWindow::Span(ns) = self.seasonal_window {
            stl = stl.with_seasonal_smoothness(ns);
        }
        if let Some(nl) = self.low_pass {
            stl = stl.with_low_pass_smoothness(nl);
        }
        if let Some(n) = self.inner_iterations {
            stl = stl.with_inner_iterations(n);
        }
        if let Some(n) = self.outer_iterations {
            stl = stl.with_outer_iterations(n);
        }
        stl
    }
}

/// Decompose column `target` of `series` into season, trend and remainder.
pub fn time_decompose(
    series: &TimeSeries,
    target: &str,
    config: &DecomposeConfig,
) -> Result<Decomposition> {
    let observed = series.require_column(target, "time_decompose")?;
    if observed.is_empty() {
        return Err(AnomalyError::EmptyData);
    }
    if observed.iter().any(|v| !v.is_finite()) {
        return Err(AnomalyError::MissingValues);
    }

    let n = observed.len();
    let timestamps = series.timestamps();
    let resolver = PeriodResolver::new(&config.template).with_message(config.message);

    let frequency = resolver
        .resolve(timestamps, &config.frequency, PeriodTarget::Frequency)?
        .trunc() as usize;
    if frequency < 2 {
        return Err(AnomalyError::InvalidInput(format!(
            "time_decompose: frequency resolved to {} observation(s); seasonal decomposition needs at least 2",
            frequency
        )));
    }
    if n < 2 * frequency {
        return Err(AnomalyError::InsufficientData {
            needed: 2 * frequency,
            got: n,
        });
    }

    let stl = config.build_stl(frequency);

    let (season, trend, remainder, trend_window) = match config.method {
        DecomposeMethod::Stl => {
            let trend_window = resolver
                .resolve(timestamps, &config.trend, PeriodTarget::Trend)?
                .round_ties_even() as usize;
            let fit = stl.with_trend_smoothness(trend_window).decompose(observed)?;
            (
                fit.seasonal,
                TrendComponent::Loess(fit.trend),
                fit.remainder,
                trend_window,
            )
        }
        DecomposeMethod::Twitter => {
            let season = stl.decompose(observed)?.seasonal;
            let trend_window = resolver.resolve(timestamps, &config.trend, PeriodTarget::Trend)?;
            // Halves round to even: 70 rows over a 28-row window make 2 spans.
            let spans_needed = ((n as f64 / trend_window).round_ties_even() as usize).max(1);
            if config.message {
                info!(spans = spans_needed, "median_span = {} observations", n / spans_needed);
            } else {
                debug!(spans = spans_needed, "median spans");
            }

            let spans = median_spans(observed, spans_needed);
            let remainder: Vec<f64> = observed
                .iter()
                .zip(season.iter())
                .zip(spans.iter())
                .map(|((y, s), m)| y - s - m)
                .collect();
            (
                season,
                TrendComponent::MedianSpans(spans),
                remainder,
                trend_window.round_ties_even() as usize,
            )
        }
    };

    Ok(Decomposition {
        timestamps: timestamps.to_vec(),
        observed: observed.to_vec(),
        season,
        trend,
        remainder,
        frequency: Some(frequency),
        trend_window: Some(trend_window),
    })
}

/// Piecewise-constant median of `spans` contiguous blocks.
///
/// Block sizes follow `rep(1..=spans, length.out = n)` sorted: the first
/// `n % spans` blocks hold one extra row.
pub fn median_spans(values: &[f64], spans: usize) -> Vec<f64> {
    let n = values.len();
    let spans = spans.clamp(1, n.max(1));
    let base = n / spans;
    let extra = n % spans;

    let mut result = Vec::with_capacity(n);
    let mut start = 0;
    for block in 0..spans {
        let size = base + usize::from(block < extra);
        let end = (start + size).min(n);
        let block_median = median(&values[start..end]);
        result.extend(std::iter::repeat(block_median).take(end - start));
        start = end;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn weekly_pattern_series(n: usize) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n).map(|i| base + Duration::days(i as i64)).collect();
        let values = (0..n)
            .map(|i| {
                let weekly = [0.0, 3.0, 5.0, 4.0, 2.0, -6.0, -8.0][i % 7];
                100.0 + 0.05 * i as f64 + weekly + 0.3 * ((i * 13 % 7) as f64 - 3.0)
            })
            .collect();
        TimeSeries::from_columns(timestamps, vec![("count".to_string(), values)]).unwrap()
    }

    fn assert_identity(d: &Decomposition) {
        for i in 0..d.len() {
            let residual =
                d.observed()[i] - d.season()[i] - d.trend().values()[i] - d.remainder()[i];
            assert!(residual.abs() <= 1e-9 * d.observed()[i].abs().max(1.0));
        }
    }

    #[test]
    fn parses_methods() {
        assert_eq!("STL".parse::<DecomposeMethod>().unwrap(), DecomposeMethod::Stl);
        assert_eq!("twitter".parse::<DecomposeMethod>().unwrap(), DecomposeMethod::Twitter);
        assert!(matches!(
            "multiplicative".parse::<DecomposeMethod>(),
            Err(AnomalyError::Unsupported(_))
        ));
    }

    #[test]
    fn stl_strategy_resolves_auto_periods() {
        let ts = weekly_pattern_series(425);
        let d = time_decompose(&ts, "count", &DecomposeConfig::stl()).unwrap();

        assert_eq!(d.len(), 425);
        assert_eq!(d.frequency(), Some(7));
        assert_eq!(d.trend_window(), Some(91));
        assert_eq!(d.method(), DecomposeMethod::Stl);
        assert!(matches!(d.trend(), TrendComponent::Loess(_)));
        assert_identity(&d);
        assert!(d.seasonal_strength() > 0.5);
    }

    #[test]
    fn twitter_strategy_uses_median_spans() {
        let ts = weekly_pattern_series(425);
        let d = time_decompose(&ts, "count", &DecomposeConfig::twitter()).unwrap();

        assert!(matches!(d.trend(), TrendComponent::MedianSpans(_)));
        assert_identity(&d);

        // round(425 / 91) = 5 blocks of 85 rows
        let spans = d.trend().values();
        let distinct_steps = spans.windows(2).filter(|w| w[0] != w[1]).count();
        assert!(distinct_steps <= 4);
        assert_relative_eq!(spans[0], spans[84]);
    }

    #[test]
    fn seventy_daily_rows_make_two_median_spans() {
        let ts = weekly_pattern_series(70);
        let d = time_decompose(&ts, "count", &DecomposeConfig::twitter()).unwrap();
        assert_eq!(d.trend_window(), Some(28));

        // 70 / 28 = 2.5 rounds to 2 blocks of 35 rows
        let spans = d.trend().values();
        assert_relative_eq!(spans[0], spans[34]);
        assert_relative_eq!(spans[35], spans[69]);
        assert!(spans[35] > spans[34]);
        assert_eq!(spans.windows(2).filter(|w| w[0] != w[1]).count(), 1);
    }

    #[test]
    fn stl_parameters_reach_the_fit() {
        let ts = weekly_pattern_series(140);
        let mut values = ts.column("count").unwrap().to_vec();
        values[50] += 60.0;
        let ts = ts.with_column("count", values).unwrap();

        let robust = time_decompose(&ts, "count", &DecomposeConfig::stl()).unwrap();
        let plain = time_decompose(
            &ts,
            "count",
            &DecomposeConfig::stl().with_outer_iterations(0),
        )
        .unwrap();
        assert!(robust.remainder()[50] > plain.remainder()[50]);

        let windowed = time_decompose(
            &ts,
            "count",
            &DecomposeConfig::stl()
                .with_seasonal_window(7)
                .with_low_pass(9)
                .with_inner_iterations(2),
        )
        .unwrap();
        assert_ne!(windowed.season(), robust.season());
        for d in [&robust, &plain, &windowed] {
            assert_identity(d);
        }

        let twitter = time_decompose(&ts, "count", &DecomposeConfig::twitter()).unwrap();
        let twitter_plain = time_decompose(
            &ts,
            "count",
            &DecomposeConfig::twitter().with_outer_iterations(0),
        )
        .unwrap();
        assert_ne!(twitter.season(), twitter_plain.season());
    }

    #[test]
    fn explicit_periods_are_honoured() {
        let ts = weekly_pattern_series(120);
        let config = DecomposeConfig::stl()
            .with_frequency(14)
            .with_trend("30 days".parse::<PeriodSpec>().unwrap());
        let d = time_decompose(&ts, "count", &config).unwrap();
        assert_eq!(d.frequency(), Some(14));
        assert_eq!(d.trend_window(), Some(30));
    }

    #[test]
    fn rejects_bad_requests() {
        let ts = weekly_pattern_series(60);

        let err = time_decompose(&ts, "sales", &DecomposeConfig::stl()).unwrap_err();
        assert!(err.to_string().contains("target column `sales` missing"));

        let err = time_decompose(&ts, "count", &DecomposeConfig::stl().with_frequency(1))
            .unwrap_err();
        assert!(matches!(err, AnomalyError::InvalidInput(_)));

        let err = time_decompose(&ts, "count", &DecomposeConfig::stl().with_frequency(40))
            .unwrap_err();
        assert_eq!(err, AnomalyError::InsufficientData { needed: 80, got: 60 });
    }

    #[test]
    fn rejects_missing_values() {
        let ts = weekly_pattern_series(30);
        let mut values = ts.column("count").unwrap().to_vec();
        values[3] = f64::NAN;
        let ts = ts.with_column("count", values).unwrap();
        assert_eq!(
            time_decompose(&ts, "count", &DecomposeConfig::stl()).unwrap_err(),
            AnomalyError::MissingValues
        );
    }

    #[test]
    fn median_spans_front_loads_larger_blocks() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let spans = median_spans(&values, 3);
        // blocks: [1..4], [5..7], [8..10]
        assert_eq!(
            spans,
            vec![2.5, 2.5, 2.5, 2.5, 6.0, 6.0, 6.0, 9.0, 9.0, 9.0]
        );
        assert_eq!(median_spans(&values, 1), vec![5.5; 10]);
    }

    #[test]
    fn merge_appends_component_columns() {
        let ts = weekly_pattern_series(60);
        let d = time_decompose(&ts, "count", &DecomposeConfig::stl()).unwrap();
        let merged = d.merge_into(&ts).unwrap();
        assert_eq!(
            merged.labels(),
            &["count", "observed", "season", "trend", "remainder"]
        );

        let table = d.to_time_series().unwrap();
        assert_eq!(table.labels(), &["observed", "season", "trend", "remainder"]);

        let other = weekly_pattern_series(61);
        assert!(d.merge_into(&other).is_err());
    }

    #[test]
    fn from_parts_checks_alignment() {
        let base = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let t = vec![base, base + Duration::days(1)];
        let ok = Decomposition::from_parts(
            t.clone(),
            vec![1.0, 2.0],
            vec![0.0, 0.0],
            TrendComponent::MedianSpans(vec![1.5, 1.5]),
            vec![-0.5, 0.5],
        );
        assert!(ok.is_ok());

        let bad = Decomposition::from_parts(
            t,
            vec![1.0, 2.0],
            vec![0.0],
            TrendComponent::Loess(vec![1.5, 1.5]),
            vec![-0.5, 0.5],
        );
        assert!(matches!(bad, Err(AnomalyError::DimensionMismatch { .. })));
    }
}
