//! STL (Seasonal-Trend decomposition using LOESS) implementation.
//!
//! STL decomposes a time series into three components:
//! - Trend: The underlying long-term pattern
//! - Seasonal: The repeating seasonal pattern
//! - Remainder: The residual after removing trend and seasonal
//!
//! Follows Cleveland, Cleveland, McRae & Terpenning (1990): an inner loop of
//! cycle-subseries smoothing, low-pass filtering and trend smoothing, and an
//! optional outer loop of bisquare robustness weights that keeps outliers from
//! leaking into the trend and seasonal fits.

use crate::error::{AnomalyError, Result};
use crate::utils::stats::{median, variance};
use tracing::trace;

/// Result of STL decomposition.
#[derive(Debug, Clone)]
pub struct STLResult {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Remainder component.
    pub remainder: Vec<f64>,
}

impl STLResult {
    /// Get the seasonal strength (0 to 1).
    /// Values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        strength(&self.seasonal, &self.remainder)
    }

    /// Get the trend strength (0 to 1).
    /// Values close to 1 indicate strong trend.
    pub fn trend_strength(&self) -> f64 {
        strength(&self.trend, &self.remainder)
    }
}

/// `1 - Var(remainder) / Var(component + remainder)`, floored at zero.
pub(crate) fn strength(component: &[f64], remainder: &[f64]) -> f64 {
    let var_remainder = variance(remainder);
    let combined: Vec<f64> = component
        .iter()
        .zip(remainder.iter())
        .map(|(c, r)| c + r)
        .collect();
    let var_combined = variance(&combined);

    if !(var_combined > 1e-10) || var_remainder.is_nan() {
        return 0.0;
    }

    (1.0 - var_remainder / var_combined).max(0.0)
}

/// Seasonal smoothing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalWindow {
    /// Seasonal pattern is identical in every cycle.
    Periodic,
    /// LOESS span (in cycles) for each cycle-subseries.
    Span(usize),
}

/// STL decomposition configuration and algorithm.
#[derive(Debug, Clone)]
pub struct STL {
    /// Seasonal period.
    seasonal_period: usize,
    /// Seasonal LOESS window (ns).
    seasonal_window: SeasonalWindow,
    /// Trend LOESS span (nt); derived from the period when unset.
    trend_smoothness: Option<usize>,
    /// Low-pass filter span (nl).
    low_pass_smoothness: usize,
    /// Number of inner iterations.
    inner_iterations: usize,
    /// Number of outer (robustness) iterations.
    outer_iterations: usize,
    /// Use robust fitting.
    robust: bool,
}

/// Round to the nearest integer and bump even values to the next odd one.
fn next_odd(x: f64) -> usize {
    let x = x.round().max(1.0) as usize;
    if x % 2 == 0 {
        x + 1
    } else {
        x
    }
}

impl STL {
    /// Create a new STL decomposer with a periodic seasonal window.
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            seasonal_window: SeasonalWindow::Periodic,
            trend_smoothness: None,
            low_pass_smoothness: next_odd(seasonal_period as f64),
            inner_iterations: 2,
            outer_iterations: 0,
            robust: false,
        }
    }

    /// Use a finite seasonal window (ns) instead of a periodic one.
    pub fn with_seasonal_smoothness(mut self, ns: usize) -> Self {
        self.seasonal_window = SeasonalWindow::Span(next_odd(ns.max(3) as f64));
        self
    }

    /// Set custom trend smoothness (nt parameter).
    pub fn with_trend_smoothness(mut self, nt: usize) -> Self {
        self.trend_smoothness = Some(next_odd(nt.max(3) as f64));
        self
    }

    /// Set custom low-pass smoothness (nl parameter).
    pub fn with_low_pass_smoothness(mut self, nl: usize) -> Self {
        self.low_pass_smoothness = next_odd(nl.max(3) as f64);
        self
    }

    /// Enable robust fitting: one inner pass per each of 15 robustness passes.
    pub fn robust(mut self) -> Self {
        self.robust = true;
        self.inner_iterations = 1;
        self.outer_iterations = 15;
        self
    }

    /// Set number of outer (robustness) iterations.
    pub fn with_outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = n;
        self.robust = n > 0;
        self
    }

    /// Set number of inner iterations.
    pub fn with_inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = n.max(1);
        self
    }

    fn seasonal_span(&self, n: usize) -> usize {
        match self.seasonal_window {
            SeasonalWindow::Periodic => 10 * n + 1,
            SeasonalWindow::Span(ns) => ns,
        }
    }

    fn seasonal_degree(&self) -> usize {
        match self.seasonal_window {
            SeasonalWindow::Periodic => 0,
            SeasonalWindow::Span(_) => 1,
        }
    }

    fn trend_span(&self, ns: usize) -> usize {
        self.trend_smoothness.unwrap_or_else(|| {
            let period = self.seasonal_period as f64;
            next_odd((1.5 * period / (1.0 - 1.5 / ns as f64)).ceil())
        })
    }

    /// Decompose the time series.
    pub fn decompose(&self, series: &[f64]) -> Result<STLResult> {
        let n = series.len();
        let period = self.seasonal_period;
        if period < 2 {
            return Err(AnomalyError::InvalidParameter(format!(
                "STL seasonal period must be at least 2, got {}",
                period
            )));
        }
        if n < 2 * period {
            return Err(AnomalyError::InsufficientData {
                needed: 2 * period,
                got: n,
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(AnomalyError::MissingValues);
        }

        let ns = self.seasonal_span(n);
        let nt = self.trend_span(ns);
        let nl = self.low_pass_smoothness;
        trace!(period, ns, nt, nl, robust = self.robust, "STL parameters");

        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        let mut weights: Option<Vec<f64>> = None;

        let mut pass = 0;
        loop {
            for _ in 0..self.inner_iterations {
                // Step 1: Detrending
                let detrended: Vec<f64> =
                    series.iter().zip(trend.iter()).map(|(y, t)| y - t).collect();

                // Step 2: Cycle-subseries smoothing, extended one cycle each side
                let cycle = self.smooth_cycle_subseries(&detrended, ns, weights.as_deref());

                // Step 3: Low-pass filter of smoothed cycle-subseries
                let low_pass = loess(&low_pass_filter(&cycle, period), nl, 1, None);

                // Step 4: Detrending of smoothed cycle-subseries
                for i in 0..n {
                    seasonal[i] = cycle[period + i] - low_pass[i];
                }

                // Step 5: Deseasonalizing
                let deseasonalized: Vec<f64> = series
                    .iter()
                    .zip(seasonal.iter())
                    .map(|(y, s)| y - s)
                    .collect();

                // Step 6: Trend smoothing
                trend = loess(&deseasonalized, nt, 1, weights.as_deref());
            }

            pass += 1;
            if !self.robust || pass > self.outer_iterations {
                break;
            }

            let fitted: Vec<f64> = seasonal.iter().zip(trend.iter()).map(|(s, t)| s + t).collect();
            weights = Some(robustness_weights(series, &fitted));
        }

        if self.seasonal_window == SeasonalWindow::Periodic {
            seasonal = cycle_means(&seasonal, period);
        }

        let remainder: Vec<f64> = series
            .iter()
            .zip(seasonal.iter())
            .zip(trend.iter())
            .map(|((y, s), t)| y - s - t)
            .collect();

        Ok(STLResult {
            trend,
            seasonal,
            remainder,
        })
    }

    /// Smooth each cycle-subseries and extrapolate one point past both ends.
    ///
    /// The output has `n + 2 * period` values: position `period + i` aligns
    /// with observation `i`.
    fn smooth_cycle_subseries(&self, detrended: &[f64], ns: usize, weights: Option<&[f64]>) -> Vec<f64> {
        let n = detrended.len();
        let period = self.seasonal_period;
        let degree = self.seasonal_degree();
        let mut result = vec![0.0; n + 2 * period];

        for cycle_pos in 0..period {
            let values: Vec<f64> = detrended.iter().skip(cycle_pos).step_by(period).copied().collect();
            let sub_weights: Option<Vec<f64>> =
                weights.map(|w| w.iter().skip(cycle_pos).step_by(period).copied().collect());
            let k = values.len();

            let smoothed = loess(&values, ns, degree, sub_weights.as_deref());

            let mut scratch = vec![0.0; k];
            let nright = ns.min(k) - 1;
            let before = loess_estimate(
                &values,
                ns,
                degree,
                -1.0,
                0,
                nright,
                sub_weights.as_deref(),
                &mut scratch,
            )
            .unwrap_or(smoothed[0]);
            let nleft = k.saturating_sub(ns);
            let after = loess_estimate(
                &values,
                ns,
                degree,
                k as f64,
                nleft,
                k - 1,
                sub_weights.as_deref(),
                &mut scratch,
            )
            .unwrap_or(smoothed[k - 1]);

            result[cycle_pos] = before;
            for (m, &v) in smoothed.iter().enumerate() {
                result[(m + 1) * period + cycle_pos] = v;
            }
            result[(k + 1) * period + cycle_pos] = after;
        }

        result
    }
}

/// Local regression estimate at position `xs` using points `nleft..=nright`.
///
/// Returns `None` when every point in the window has zero weight.
#[allow(clippy::too_many_arguments)]
fn loess_estimate(
    y: &[f64],
    span: usize,
    degree: usize,
    xs: f64,
    nleft: usize,
    nright: usize,
    robustness: Option<&[f64]>,
    w: &mut [f64],
) -> Option<f64> {
    let n = y.len();
    let range = n as f64 - 1.0;
    let mut h = (xs - nleft as f64).max(nright as f64 - xs);
    if span > n {
        h += ((span - n) / 2) as f64;
    }
    let h9 = 0.999 * h;
    let h1 = 0.001 * h;

    let mut total = 0.0;
    for j in nleft..=nright {
        w[j] = 0.0;
        let r = (j as f64 - xs).abs();
        if r <= h9 {
            w[j] = if r <= h1 {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            if let Some(rw) = robustness {
                w[j] *= rw[j];
            }
            total += w[j];
        }
    }
    if total <= 0.0 {
        return None;
    }

    for wj in &mut w[nleft..=nright] {
        *wj /= total;
    }

    if h > 0.0 && degree > 0 {
        let center: f64 = (nleft..=nright).map(|j| w[j] * j as f64).sum();
        let spread: f64 = (nleft..=nright)
            .map(|j| w[j] * (j as f64 - center).powi(2))
            .sum();
        if spread.sqrt() > 0.001 * range {
            let slope = (xs - center) / spread;
            for j in nleft..=nright {
                w[j] *= slope * (j as f64 - center) + 1.0;
            }
        }
    }

    Some((nleft..=nright).map(|j| w[j] * y[j]).sum())
}

/// LOESS smoothing evaluated at every position.
fn loess(values: &[f64], span: usize, degree: usize, robustness: Option<&[f64]>) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }

    let mut result = vec![0.0; n];
    let mut scratch = vec![0.0; n];

    if span >= n {
        for i in 0..n {
            result[i] = loess_estimate(
                values,
                span,
                degree,
                i as f64,
                0,
                n - 1,
                robustness,
                &mut scratch,
            )
            .unwrap_or(values[i]);
        }
        return result;
    }

    let half = (span + 1) / 2;
    let mut nleft = 0;
    let mut nright = span - 1;
    for i in 0..n {
        if i + 1 > half && nright != n - 1 {
            nleft += 1;
            nright += 1;
        }
        result[i] = loess_estimate(
            values,
            span,
            degree,
            i as f64,
            nleft,
            nright,
            robustness,
            &mut scratch,
        )
        .unwrap_or(values[i]);
    }

    result
}

/// Trailing moving average; output has `len(series) - window + 1` values.
fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(series.len() - window + 1);
    let mut sum: f64 = series[..window].iter().sum();
    result.push(sum / window as f64);
    for i in window..series.len() {
        sum += series[i] - series[i - window];
        result.push(sum / window as f64);
    }
    result
}

/// Low-pass filter: MA(period), MA(period), MA(3). Shrinks `n + 2 * period`
/// values back to `n`.
fn low_pass_filter(series: &[f64], period: usize) -> Vec<f64> {
    let ma1 = moving_average(series, period);
    let ma2 = moving_average(&ma1, period);
    moving_average(&ma2, 3)
}

/// Bisquare robustness weights with scale `6 * median(|residual|)`.
fn robustness_weights(series: &[f64], fitted: &[f64]) -> Vec<f64> {
    let residuals: Vec<f64> = series
        .iter()
        .zip(fitted.iter())
        .map(|(y, f)| (y - f).abs())
        .collect();
    let h = 6.0 * median(&residuals);
    let c9 = 0.999 * h;
    let c1 = 0.001 * h;

    residuals
        .iter()
        .map(|&r| {
            if r <= c1 {
                1.0
            } else if r <= c9 {
                (1.0 - (r / h).powi(2)).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

/// Replace each value by the mean of its cycle position.
fn cycle_means(seasonal: &[f64], period: usize) -> Vec<f64> {
    let means: Vec<f64> = (0..period)
        .map(|pos| {
            let values: Vec<f64> = seasonal.iter().skip(pos).step_by(period).copied().collect();
            values.iter().sum::<f64>() / values.len() as f64
        })
        .collect();
    (0..seasonal.len()).map(|i| means[i % period]).collect()
}
