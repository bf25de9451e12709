//! Replacement of anomalous observations by their seasonal + trend fit.

use crate::anomaly::anomalize::{anomaly_from_table, trend_from_table};
use crate::anomaly::{columns, Anomalized};
use crate::core::TimeSeries;
use crate::detection::Anomaly;
use crate::error::Result;
use crate::seasonality::columns as decomposition_columns;

/// Observed values with anomalies repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSeries {
    pub observed_cleaned: Vec<f64>,
    /// Number of rows that were replaced.
    pub replaced: usize,
}

/// Replace every `Yes` row with `season + trend` (or `season + median_spans`).
pub fn clean_anomalies(anomalized: &Anomalized) -> CleanedSeries {
    let d = anomalized.decomposition();
    clean(
        d.observed(),
        d.season(),
        d.trend().values(),
        anomalized.anomalies(),
    )
}

/// Append `observed_cleaned` to an anomalized table.
///
/// Requires `observed`, `season`, `anomaly` and one of `trend` or
/// `median_spans`.
pub fn clean_table(series: &TimeSeries) -> Result<TimeSeries> {
    const COMPONENT: &str = "clean_anomalies";
    let trend = trend_from_table(series, COMPONENT)?;
    let observed = series.require_column(decomposition_columns::OBSERVED, COMPONENT)?;
    let season = series.require_column(decomposition_columns::SEASON, COMPONENT)?;
    let anomaly = anomaly_from_table(series, COMPONENT)?;

    let cleaned = clean(observed, season, trend.values(), &anomaly);
    series
        .clone()
        .with_column(columns::OBSERVED_CLEANED, cleaned.observed_cleaned)
}

fn clean(observed: &[f64], season: &[f64], trend: &[f64], anomaly: &[Anomaly]) -> CleanedSeries {
    let mut replaced = 0;
    let observed_cleaned: Vec<f64> = observed
        .iter()
        .zip(season.iter().zip(trend))
        .zip(anomaly)
        .map(|((&y, (s, t)), flag)| {
            if flag.is_yes() {
                replaced += 1;
                s + t
            } else {
                y
            }
        })
        .collect();
    CleanedSeries {
        observed_cleaned,
        replaced,
    }
}
