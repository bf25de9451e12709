//! Recomposition of remainder limits onto the observed scale.

use crate::anomaly::anomalize::trend_from_table;
use crate::anomaly::{columns, Anomalized};
use crate::core::TimeSeries;
use crate::error::Result;
use crate::seasonality::columns as decomposition_columns;

/// Lower/upper bands on the observed scale.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomposedBands {
    pub recomposed_l1: Vec<f64>,
    pub recomposed_l2: Vec<f64>,
}

impl RecomposedBands {
    pub fn len(&self) -> usize {
        self.recomposed_l1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recomposed_l1.is_empty()
    }

    /// Whether `value` at row `i` lies inside the band. Out-of-range rows are
    /// never inside.
    pub fn contains(&self, i: usize, value: f64) -> bool {
        match (self.recomposed_l1.get(i), self.recomposed_l2.get(i)) {
            (Some(&lower), Some(&upper)) => value >= lower && value <= upper,
            _ => false,
        }
    }
}

/// `season + trend + remainder_l1` and `season + trend + remainder_l2`.
pub fn time_recompose(anomalized: &Anomalized) -> RecomposedBands {
    let fitted = anomalized.decomposition().fitted();
    RecomposedBands {
        recomposed_l1: add(&fitted, anomalized.remainder_l1()),
        recomposed_l2: add(&fitted, anomalized.remainder_l2()),
    }
}

/// Append `recomposed_l1` and `recomposed_l2` to an anomalized table.
///
/// Requires `observed`, `season`, `trend` or `median_spans`, `remainder`,
/// `remainder_l1` and `remainder_l2`.
pub fn recompose_table(series: &TimeSeries) -> Result<TimeSeries> {
    const COMPONENT: &str = "time_recompose";
    series.require_column(decomposition_columns::OBSERVED, COMPONENT)?;
    series.require_column(decomposition_columns::REMAINDER, COMPONENT)?;
    let lower = series.require_column(columns::REMAINDER_L1, COMPONENT)?;
    let upper = series.require_column(columns::REMAINDER_L2, COMPONENT)?;
    let season = series.require_column(decomposition_columns::SEASON, COMPONENT)?;
    let trend = trend_from_table(series, COMPONENT)?;

    let fitted = add(season, trend.values());
    let recomposed_l1 = add(&fitted, lower);
    let recomposed_l2 = add(&fitted, upper);
    series
        .clone()
        .with_column(columns::RECOMPOSED_L1, recomposed_l1)?
        .with_column(columns::RECOMPOSED_L2, recomposed_l2)
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}
