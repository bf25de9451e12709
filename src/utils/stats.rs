//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Consistency constant that scales the MAD to the standard deviation of a
/// normal distribution.
pub const MAD_SCALE: f64 = 1.4826;

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted_copy(values);
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Scaled median absolute deviation: `1.4826 * median(|x - median(x)|)`.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    MAD_SCALE * median(&deviations)
}

/// Sample quantile with linear interpolation between order statistics
/// (Hyndman & Fan type 7).
///
/// # Example
/// ```
/// use anofox_anomaly::utils::stats::quantile;
///
/// let q = quantile(&[1.0, 2.0, 3.0, 4.0], 0.25);
/// assert!((q - 1.75).abs() < 1e-12);
/// ```
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    let sorted = sorted_copy(values);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Quantile of the Student's t distribution with `df` degrees of freedom.
///
/// Returns NaN when the distribution is undefined (`df <= 0`) or `p` lies
/// outside `(0, 1)`.
pub fn quantile_t(p: f64, df: f64) -> f64 {
    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variance_calculates_correctly() {
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn median_calculates_correctly() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn mad_is_scaled() {
        // deviations from 3: [2, 1, 0, 1, 2] -> median 1
        assert_relative_eq!(mad(&[1.0, 2.0, 3.0, 4.0, 5.0]), MAD_SCALE, epsilon = 1e-12);
        assert_relative_eq!(mad(&[7.0, 7.0, 7.0]), 0.0);
        assert!(mad(&[]).is_nan());
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_relative_eq!(quantile(&x, 0.25), 3.25, epsilon = 1e-12);
        assert_relative_eq!(quantile(&x, 0.75), 7.75, epsilon = 1e-12);
        assert_relative_eq!(quantile(&x, 0.0), 1.0);
        assert_relative_eq!(quantile(&x, 1.0), 10.0);
        assert_relative_eq!(quantile(&[4.0], 0.3), 4.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn quantile_t_known_values() {
        assert_relative_eq!(quantile_t(0.975, 10.0), 2.228139, epsilon = 1e-4);
        assert_relative_eq!(quantile_t(0.5, 5.0), 0.0, epsilon = 1e-8);
        assert_relative_eq!(quantile_t(0.95, 1.0), 6.313752, epsilon = 1e-3);
    }

    #[test]
    fn quantile_t_undefined_cases() {
        assert!(quantile_t(0.975, 0.0).is_nan());
        assert!(quantile_t(0.975, -1.0).is_nan());
        assert!(quantile_t(1.0, 5.0).is_nan());
    }
}
