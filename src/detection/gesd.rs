//! Generalized extreme studentized deviate (GESD) outlier detection.

use crate::detection::outlier::{
    classification, critical_limits, max_anomaly_count, validate, Anomaly, Direction,
    OutlierDetector, OutlierMethod, OutlierResult, ReportRow,
};
use crate::error::{AnomalyError, Result};
use crate::utils::stats::{mad, median, quantile_t};
use tracing::{debug, trace};

/// GESD detector.
///
/// Runs `r = floor(max_anoms · n)` iterations. Each one recentres on the
/// median and scaled MAD of the points still remaining, removes the most
/// extreme point and compares its statistic with a Student-t critical value.
/// The outliers are the points removed up to the *last* iteration whose
/// statistic exceeded its critical value.
#[derive(Debug, Clone, Copy)]
pub struct Gesd {
    alpha: f64,
    max_anoms: f64,
    verbose: bool,
}

impl Default for Gesd {
    fn default() -> Self {
        Self::new(0.05, 0.2)
    }
}

impl Gesd {
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

    /// Critical value `lambda_i` for iteration `i` (1-based) on `n` points.
    ///
    /// NaN when the t distribution has no positive degrees of freedom.
    pub fn critical_value(&self, n: usize, i: usize) -> f64 {
        let n = n as f64;
        let i = i as f64;
        let p = 1.0 - self.alpha / (2.0 * (n - i + 1.0));
        let t = quantile_t(p, n - i - 1.0);
        (n - i) * t / ((n - i - 1.0 + t * t) * (n - i + 1.0)).sqrt()
    }
}

struct Iteration {
    index: usize,
    value: f64,
    statistic: f64,
    critical_value: f64,
    median: f64,
    mad: f64,
}

impl OutlierDetector for Gesd {
    fn detect(&self, values: &[f64]) -> Result<OutlierResult> {
        validate(values, self.alpha, self.max_anoms)?;
        let n = values.len();
        let r = max_anomaly_count(n, self.max_anoms);
        if r == 0 {
            return Err(AnomalyError::InsufficientData {
                needed: (1.0 / self.max_anoms).ceil() as usize,
                got: n,
            });
        }

        let mut remaining: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
        let mut iterations = Vec::with_capacity(r);
        let mut last_passing = 0;

        for i in 1..=r {
            let current: Vec<f64> = remaining.iter().map(|&(_, v)| v).collect();
            let center = median(&current);
            let spread = mad(&current);
            let denominator = spread + f64::EPSILON;

            // First index wins ties.
            let mut worst = 0;
            let mut statistic = f64::NEG_INFINITY;
            for (pos, &v) in current.iter().enumerate() {
                let z = (v - center).abs() / denominator;
                if z > statistic {
                    statistic = z;
                    worst = pos;
                }
            }

            let (index, value) = remaining.remove(worst);
            let critical_value = self.critical_value(n, i);
            if statistic > critical_value {
                last_passing = i;
            }
            trace!(i, index, statistic, critical_value, "gesd iteration");

            iterations.push(Iteration {
                index,
                value,
                statistic,
                critical_value,
                median: center,
                mad: spread,
            });
        }

        let report: Vec<ReportRow> = iterations
            .iter()
            .enumerate()
            .map(|(k, it)| {
                let reported = k < last_passing;
                // Side of the iteration median, not of `limit_upper`: that limit is
                // `λ·MAD − median` and goes negative once the level is far above zero.
                // Every reported row gets a direction, including rows pulled in by a
                // later passing iteration.
                let direction = reported.then(|| {
                    if it.value > it.median {
                        Direction::Up
                    } else {
                        Direction::Down
                    }
                });
                ReportRow {
                    rank: k + 1,
                    index: it.index,
                    value: it.value,
                    limit_lower: it.median - it.critical_value * it.mad,
                    limit_upper: it.critical_value * it.mad - it.median,
                    score: it.statistic,
                    critical_value: Some(it.critical_value),
                    outlier: Anomaly::from(it.statistic > it.critical_value),
                    outlier_reported: Anomaly::from(reported),
                    direction,
                }
            })
            .collect();

        let critical_limits = critical_limits(&report);
        let classification = classification(n, &report);

        if self.verbose {
            debug!(
                method = "gesd",
                n,
                iterations = r,
                last_passing,
                limit_lower = critical_limits.lower,
                limit_upper = critical_limits.upper,
                "outlier detection summary"
            );
        }

        Ok(OutlierResult {
            method: OutlierMethod::Gesd,
            classification,
            critical_limits,
            report,
        })
    }

    fn name(&self) -> &'static str {
        "gesd"
    }
}

/// GESD classification of `values`.
pub fn gesd(values: &[f64], alpha: f64, max_anoms: f64) -> Result<Vec<Anomaly>> {
    Gesd::new(alpha, max_anoms).flag(values)
}
