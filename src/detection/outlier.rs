//! Outlier detection on residual vectors.
//!
//! Two interchangeable strategies implement [`OutlierDetector`]:
//! - [`Iqr`]: fixed limits from the interquartile range
//! - [`Gesd`]: generalized extreme studentized deviate test with recentering
//!
//! Both return an [`OutlierResult`] holding the per-point classification, the
//! critical limits used for recomposition and a ranked report.

use crate::detection::{Gesd, Iqr};
use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Method for outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Interquartile range limits.
    #[default]
    Iqr,
    /// Generalized extreme studentized deviate test.
    Gesd,
}

impl FromStr for OutlierMethod {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "gesd" => Ok(OutlierMethod::Gesd),
            other => Err(AnomalyError::Unsupported(format!(
                "anomaly method `{}` (expected `iqr` or `gesd`)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => f.write_str("iqr"),
            OutlierMethod::Gesd => f.write_str("gesd"),
        }
    }
}

/// Yes/No anomaly flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Anomaly {
    #[default]
    No,
    Yes,
}

impl Anomaly {
    pub fn is_yes(self) -> bool {
        self == Anomaly::Yes
    }

    /// Numeric encoding used in table columns.
    pub fn as_f64(self) -> f64 {
        match self {
            Anomaly::No => 0.0,
            Anomaly::Yes => 1.0,
        }
    }
}

impl From<bool> for Anomaly {
    fn from(flag: bool) -> Self {
        if flag {
            Anomaly::Yes
        } else {
            Anomaly::No
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::No => f.write_str("No"),
            Anomaly::Yes => f.write_str("Yes"),
        }
    }
}

/// Side of the limits an anomaly falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("Up"),
            Direction::Down => f.write_str("Down"),
        }
    }
}

/// Lower/upper limits on the residual scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalLimits {
    pub lower: f64,
    pub upper: f64,
}

/// One ranked row of the diagnostic report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// 1-based rank: distance from centre (IQR) or removal order (GESD).
    pub rank: usize,
    /// Position in the input vector.
    pub index: usize,
    pub value: f64,
    pub limit_lower: f64,
    pub limit_upper: f64,
    /// Distance beyond the violated limit (IQR) or test statistic (GESD).
    pub score: f64,
    /// Critical value of the GESD test at this row's iteration.
    pub critical_value: Option<f64>,
    /// The row's own test outcome, before the anomaly cap.
    pub outlier: Anomaly,
    /// Final classification.
    pub outlier_reported: Anomaly,
    pub direction: Option<Direction>,
}

/// Result of outlier detection.
#[derive(Debug, Clone)]
pub struct OutlierResult {
    /// Method used.
    pub method: OutlierMethod,
    /// Classification aligned with the input vector.
    pub classification: Vec<Anomaly>,
    /// Limits for downstream recomposition.
    pub critical_limits: CriticalLimits,
    /// Ranked report, most extreme first.
    pub report: Vec<ReportRow>,
}

impl OutlierResult {
    /// Input positions classified `Yes`, in report order.
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.reported_rows().map(|row| row.index).collect()
    }

    pub fn outlier_values(&self) -> Vec<f64> {
        self.reported_rows().map(|row| row.value).collect()
    }

    pub fn outlier_directions(&self) -> Vec<Direction> {
        self.reported_rows().filter_map(|row| row.direction).collect()
    }

    /// Get the number of outliers detected.
    pub fn outlier_count(&self) -> usize {
        self.classification.iter().filter(|a| a.is_yes()).count()
    }

    /// Check if a specific index is an outlier.
    pub fn is_outlier(&self, index: usize) -> bool {
        self.classification
            .get(index)
            .is_some_and(|a| a.is_yes())
    }

    /// Get outlier percentage.
    pub fn outlier_percentage(&self) -> f64 {
        if self.classification.is_empty() {
            0.0
        } else {
            100.0 * self.outlier_count() as f64 / self.classification.len() as f64
        }
    }

    fn reported_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.report
            .iter()
            .filter(|row| row.outlier_reported.is_yes())
    }
}

/// Trait for residual outlier detectors.
pub trait OutlierDetector {
    /// Run the detector and return the full diagnostic bundle.
    fn detect(&self, values: &[f64]) -> Result<OutlierResult>;

    /// Only the Yes/No classification.
    fn flag(&self, values: &[f64]) -> Result<Vec<Anomaly>> {
        Ok(self.detect(values)?.classification)
    }

    /// Get the name of this detection method.
    fn name(&self) -> &'static str;
}

/// Configuration for outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Detection method.
    pub method: OutlierMethod,
    /// Significance level in (0, 1); smaller values widen the limits.
    pub alpha: f64,
    /// Maximum fraction of points that may be reported, in (0, 1].
    pub max_anoms: f64,
    /// Log a detection summary at `debug` level.
    pub verbose: bool,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            method: OutlierMethod::Iqr,
            alpha: 0.05,
            max_anoms: 0.2,
            verbose: false,
        }
    }
}

impl OutlierConfig {
    pub fn iqr() -> Self {
        Self::default()
    }

    pub fn gesd() -> Self {
        Self::default().with_method(OutlierMethod::Gesd)
    }

    pub fn with_method(mut self, method: OutlierMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_anoms(mut self, max_anoms: f64) -> Self {
        self.max_anoms = max_anoms;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Boxed detector for the configured method.
    pub fn detector(&self) -> Box<dyn OutlierDetector> {
        match self.method {
            OutlierMethod::Iqr => Box::new(
                Iqr::new(self.alpha, self.max_anoms).with_verbose(self.verbose),
            ),
            OutlierMethod::Gesd => Box::new(
                Gesd::new(self.alpha, self.max_anoms).with_verbose(self.verbose),
            ),
        }
    }
}

/// Detect outliers in a residual vector.
pub fn detect_outliers(values: &[f64], config: &OutlierConfig) -> Result<OutlierResult> {
    config.detector().detect(values)
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(crate) fn validate(values: &[f64], alpha: f64, max_anoms: f64) -> Result<()> {
    if values.is_empty() {
        return Err(AnomalyError::EmptyData);
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AnomalyError::InvalidParameter(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    if !(max_anoms > 0.0 && max_anoms <= 1.0) {
        return Err(AnomalyError::InvalidParameter(format!(
            "max_anoms must be in (0, 1], got {}",
            max_anoms
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnomalyError::MissingValues);
    }
    Ok(())
}

/// `floor(max_anoms * n)`.
pub(crate) fn max_anomaly_count(n: usize, max_anoms: f64) -> usize {
    (max_anoms * n as f64).floor() as usize
}

/// Limits of the first row whose own test failed, else of the last row.
pub(crate) fn critical_limits(report: &[ReportRow]) -> CriticalLimits {
    let row = report
        .iter()
        .find(|row| !row.outlier.is_yes())
        .or_else(|| report.last());
    match row {
        Some(row) => CriticalLimits {
            lower: row.limit_lower,
            upper: row.limit_upper,
        },
        None => CriticalLimits {
            lower: f64::NAN,
            upper: f64::NAN,
        },
    }
}

pub(crate) fn classification(n: usize, report: &[ReportRow]) -> Vec<Anomaly> {
    let mut flags = vec![Anomaly::No; n];
    for row in report.iter().filter(|row| row.outlier_reported.is_yes()) {
        flags[row.index] = Anomaly::Yes;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, outlier: Anomaly, lower: f64, upper: f64) -> ReportRow {
        ReportRow {
            rank: index + 1,
            index,
            value: 0.0,
            limit_lower: lower,
            limit_upper: upper,
            score: 0.0,
            critical_value: None,
            outlier,
            outlier_reported: outlier,
            direction: None,
        }
    }

    #[test]
    fn parses_methods() {
        assert_eq!("IQR".parse::<OutlierMethod>().unwrap(), OutlierMethod::Iqr);
        assert_eq!("gesd".parse::<OutlierMethod>().unwrap(), OutlierMethod::Gesd);
        assert!(matches!(
            "zscore".parse::<OutlierMethod>(),
            Err(AnomalyError::Unsupported(_))
        ));
        assert_eq!(OutlierMethod::Gesd.to_string(), "gesd");
    }

    #[test]
    fn validates_parameters() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(validate(&[], 0.05, 0.2), Err(AnomalyError::EmptyData));
        assert!(validate(&values, 0.0, 0.2).is_err());
        assert!(validate(&values, 1.0, 0.2).is_err());
        assert!(validate(&values, 0.05, 0.0).is_err());
        assert!(validate(&values, 0.05, 1.5).is_err());
        assert!(validate(&values, 0.05, 1.0).is_ok());
        assert_eq!(
            validate(&[1.0, f64::NAN], 0.05, 0.2),
            Err(AnomalyError::MissingValues)
        );
    }

    #[test]
    fn cap_is_floored() {
        assert_eq!(max_anomaly_count(100, 0.2), 20);
        assert_eq!(max_anomaly_count(9, 0.2), 1);
        assert_eq!(max_anomaly_count(4, 0.2), 0);
        assert_eq!(max_anomaly_count(7, 1.0), 7);
    }

    #[test]
    fn limits_come_from_first_passing_row() {
        let report = vec![
            row(0, Anomaly::Yes, -1.0, 1.0),
            row(1, Anomaly::No, -2.0, 2.0),
            row(2, Anomaly::No, -3.0, 3.0),
        ];
        assert_eq!(
            critical_limits(&report),
            CriticalLimits {
                lower: -2.0,
                upper: 2.0
            }
        );

        let all_outliers = vec![
            row(0, Anomaly::Yes, -1.0, 1.0),
            row(1, Anomaly::Yes, -4.0, 4.0),
        ];
        assert_eq!(critical_limits(&all_outliers).upper, 4.0);
        assert!(critical_limits(&[]).lower.is_nan());
    }

    #[test]
    fn result_accessors() {
        let mut report = vec![row(2, Anomaly::Yes, -1.0, 1.0), row(0, Anomaly::No, -1.0, 1.0)];
        report[0].value = 9.0;
        report[0].direction = Some(Direction::Up);
        let result = OutlierResult {
            method: OutlierMethod::Iqr,
            classification: classification(4, &report),
            critical_limits: critical_limits(&report),
            report,
        };

        assert_eq!(result.outlier_indices(), vec![2]);
        assert_eq!(result.outlier_values(), vec![9.0]);
        assert_eq!(result.outlier_directions(), vec![Direction::Up]);
        assert_eq!(result.outlier_count(), 1);
        assert!(result.is_outlier(2));
        assert!(!result.is_outlier(10));
        assert!((result.outlier_percentage() - 25.0).abs() < 1e-10);
    }

    #[test]
    fn default_config() {
        let config = OutlierConfig::default();
        assert_eq!(config.method, OutlierMethod::Iqr);
        assert!((config.alpha - 0.05).abs() < 1e-12);
        assert!((config.max_anoms - 0.2).abs() < 1e-12);
        assert_eq!(config.detector().name(), "iqr");
        assert_eq!(OutlierConfig::gesd().detector().name(), "gesd");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: OutlierConfig =
            serde_json::from_str(r#"{"method":"gesd","alpha":0.025}"#).unwrap();
        assert_eq!(config.method, OutlierMethod::Gesd);
        assert!((config.alpha - 0.025).abs() < 1e-12);
        assert!((config.max_anoms - 0.2).abs() < 1e-12);
    }
}
