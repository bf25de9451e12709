//! Interquartile-range outlier detection.

use crate::detection::outlier::{
    classification, critical_limits, max_anomaly_count, validate, Anomaly, Direction,
    OutlierDetector, OutlierMethod, OutlierResult, ReportRow,
};
use crate::error::Result;
use crate::utils::stats::quantile;
use std::cmp::Ordering;
use tracing::debug;

/// IQR detector.
///
/// Limits are `q1 - f·IQR` and `q3 + f·IQR` with `f = 0.15 / alpha`, so the
/// default `alpha = 0.05` gives the classic 3·IQR fence. Points beyond the
/// limits are ranked by how far they exceed them and at most
/// `floor(max_anoms · n)` of them are reported.
#[derive(Debug, Clone, Copy)]
pub struct Iqr {
    alpha: f64,
    max_anoms: f64,
    verbose: bool,
}

impl Default for Iqr {
    fn default() -> Self {
        Self::new(0.05, 0.2)
    }
}

impl Iqr {
    pub fn new(alpha: f64, max_anoms: f64) -> Self {
        Self {
            alpha,
            max_anoms,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Multiplier applied to the interquartile range.
    pub fn factor(&self) -> f64 {
        0.15 / self.alpha
    }
}

impl OutlierDetector for Iqr {
    fn detect(&self, values: &[f64]) -> Result<OutlierResult> {
        validate(values, self.alpha, self.max_anoms)?;
        let n = values.len();

        let q1 = quantile(values, 0.25);
        let q3 = quantile(values, 0.75);
        let spread = self.factor() * (q3 - q1);
        let limit_lower = q1 - spread;
        let limit_upper = q3 + spread;
        let centerline = (limit_lower + limit_upper) / 2.0;

        // Rank by distance from the centre, then order by exceedance.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let da = (values[a] - centerline).abs();
            let db = (values[b] - centerline).abs();
            db.partial_cmp(&da).unwrap_or(Ordering::Equal)
        });

        let mut rows: Vec<ReportRow> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let value = values[index];
                let score = if value <= limit_lower {
                    limit_lower - value
                } else if value >= limit_upper {
                    value - limit_upper
                } else {
                    0.0
                };
                ReportRow {
                    rank: position + 1,
                    index,
                    value,
                    limit_lower,
                    limit_upper,
                    score,
                    critical_value: None,
                    outlier: Anomaly::from(score > 0.0),
                    outlier_reported: Anomaly::No,
                    direction: None,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let cap = max_anomaly_count(n, self.max_anoms);
        for row in rows.iter_mut().take(cap) {
            if row.outlier.is_yes() {
                row.outlier_reported = Anomaly::Yes;
                row.direction = if row.value > limit_upper {
                    Some(Direction::Up)
                } else if row.value < limit_lower {
                    Some(Direction::Down)
                } else {
                    None
                };
            }
        }

        let critical_limits = critical_limits(&rows);
        let classification = classification(n, &rows);
        rows.truncate(cap);

        if self.verbose {
            let candidates = values
                .iter()
                .filter(|&&v| v < limit_lower || v > limit_upper)
                .count();
            debug!(
                method = "iqr",
                n,
                q1,
                q3,
                limit_lower,
                limit_upper,
                candidates,
                cap,
                reported = classification.iter().filter(|a| a.is_yes()).count(),
                "outlier detection summary"
            );
        }

        Ok(OutlierResult {
            method: OutlierMethod::Iqr,
            classification,
            critical_limits,
            report: rows,
        })
    }

    fn name(&self) -> &'static str {
        "iqr"
    }
}

/// IQR classification of `values` with default-style parameters.
pub fn iqr(values: &[f64], alpha: f64, max_anoms: f64) -> Result<Vec<Anomaly>> {
    Iqr::new(alpha, max_anoms).flag(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnomalyError;
    use approx::assert_relative_eq;

    fn wavy(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.7).sin()).collect()
    }

    #[test]
    fn flags_spikes_in_both_directions() {
        let mut series = wavy(100);
        series[50] = 100.0;
        series[75] = -50.0;

        let result = Iqr::default().detect(&series).unwrap();

        assert_eq!(result.outlier_count(), 2);
        assert!(result.is_outlier(50));
        assert!(result.is_outlier(75));
        // Largest exceedance first.
        assert_eq!(result.outlier_indices(), vec![50, 75]);
        assert_eq!(
            result.outlier_directions(),
            vec![Direction::Up, Direction::Down]
        );
    }

    #[test]
    fn limits_follow_alpha() {
        let values: Vec<f64> = (1..=9).map(|i| i as f64).collect();
        // q1 = 3, q3 = 7, IQR = 4
        let result = Iqr::new(0.05, 0.2).detect(&values).unwrap();
        assert_relative_eq!(result.critical_limits.lower, 3.0 - 12.0);
        assert_relative_eq!(result.critical_limits.upper, 7.0 + 12.0);

        let wide = Iqr::new(0.025, 0.2).detect(&values).unwrap();
        assert_relative_eq!(wide.critical_limits.upper, 7.0 + 24.0);
    }

    #[test]
    fn cap_demotes_lower_ranked_candidates() {
        let mut series = vec![0.0; 20];
        for (k, i) in [2, 5, 9, 14].iter().enumerate() {
            series[*i] = 10.0 * (k + 1) as f64;
        }
        // floor(0.1 * 20) = 2
        let result = Iqr::new(0.05, 0.1).detect(&series).unwrap();
        assert_eq!(result.outlier_count(), 2);
        assert!(result.is_outlier(14));
        assert!(result.is_outlier(9));
        assert!(!result.is_outlier(5));
        assert_eq!(result.report.len(), 2);
    }

    #[test]
    fn no_outliers_in_smooth_series() {
        let series: Vec<f64> = (0..100).map(|i| 10.0 + 0.01 * i as f64).collect();
        let result = Iqr::default().detect(&series).unwrap();
        assert_eq!(result.outlier_count(), 0);
        assert!(result.report.iter().all(|r| r.direction.is_none()));
    }

    #[test]
    fn constant_series_has_no_outliers() {
        let series = vec![5.0; 100];
        let flags = iqr(&series, 0.05, 0.2).unwrap();
        assert!(flags.iter().all(|a| *a == Anomaly::No));
    }

    #[test]
    fn quartiles_ignore_the_extreme_value() {
        // q1 = 1, q3 = 3, IQR = 2, factor 3 -> upper = 9
        let inside = Iqr::new(0.05, 1.0)
            .detect(&[0.0, 1.0, 2.0, 3.0, 8.5])
            .unwrap();
        assert_relative_eq!(inside.critical_limits.upper, 9.0, epsilon = 1e-9);
        assert_eq!(inside.outlier_count(), 0);

        let outside = Iqr::new(0.05, 1.0)
            .detect(&[0.0, 1.0, 2.0, 3.0, 9.5])
            .unwrap();
        assert_eq!(outside.outlier_indices(), vec![4]);
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(
            Iqr::default().detect(&[]).unwrap_err(),
            AnomalyError::EmptyData
        );
        assert!(matches!(
            iqr(&[1.0, 2.0], 1.2, 0.2),
            Err(AnomalyError::InvalidParameter(_))
        ));
    }
}
