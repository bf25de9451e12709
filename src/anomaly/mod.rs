//! Anomaly workflow on top of a decomposition.
//!
//! This module provides:
//! - `anomalize`: score a decomposition remainder (or any column)
//! - `time_recompose`: lower/upper bands on the observed scale
//! - `clean_anomalies`: repaired observations for downstream forecasting

mod anomalize;
mod clean;
mod recompose;

pub use anomalize::{
    anomalize, anomalize_column, detect_anomalies, AnomalizeConfig, Anomalized, ColumnAnomalies,
};
pub use clean::{clean_anomalies, clean_table, CleanedSeries};
pub use recompose::{recompose_table, time_recompose, RecomposedBands};

/// Column labels added by the anomaly workflow.
pub mod columns {
    pub const REMAINDER_L1: &str = "remainder_l1";
    pub const REMAINDER_L2: &str = "remainder_l2";
    pub const ANOMALY: &str = "anomaly";
    pub const RECOMPOSED_L1: &str = "recomposed_l1";
    pub const RECOMPOSED_L2: &str = "recomposed_l2";
    pub const OBSERVED_CLEANED: &str = "observed_cleaned";
}
