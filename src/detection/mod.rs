//! Outlier detection on residual vectors.
//!
//! This module provides:
//! - IQR: quartile fences scaled by `0.15 / alpha`
//! - GESD: iterative extreme studentized deviate test

mod gesd;
mod iqr;
mod outlier;

pub use gesd::{gesd, Gesd};
pub use iqr::{iqr, Iqr};
pub use outlier::{
    detect_outliers, Anomaly, CriticalLimits, Direction, OutlierConfig, OutlierDetector,
    OutlierMethod, OutlierResult, ReportRow,
};
