//! Anomaly scoring of decomposition remainders and arbitrary columns.

use crate::anomaly::columns;
use crate::anomaly::{clean_anomalies, time_recompose, CleanedSeries, RecomposedBands};
use crate::core::TimeSeries;
use crate::detection::{Anomaly, CriticalLimits, OutlierConfig, OutlierResult};
use crate::error::{AnomalyError, Result};
use crate::seasonality::{
    columns as decomposition_columns, time_decompose, DecomposeConfig, Decomposition,
    TrendComponent,
};
use tracing::debug;

/// Detector settings used by [`anomalize`] and [`anomalize_column`].
pub type AnomalizeConfig = OutlierConfig;

/// A decomposition with its remainder scored.
#[derive(Debug, Clone)]
pub struct Anomalized {
    decomposition: Decomposition,
    remainder_l1: Vec<f64>,
    remainder_l2: Vec<f64>,
    anomaly: Vec<Anomaly>,
    outliers: Option<OutlierResult>,
}

impl Anomalized {
    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    pub fn len(&self) -> usize {
        self.anomaly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anomaly.is_empty()
    }

    /// Lower remainder limit per row.
    pub fn remainder_l1(&self) -> &[f64] {
        &self.remainder_l1
    }

    /// Upper remainder limit per row.
    pub fn remainder_l2(&self) -> &[f64] {
        &self.remainder_l2
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomaly
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomaly.iter().filter(|a| a.is_yes()).count()
    }

    /// Detector diagnostics. `None` when rebuilt from a table.
    pub fn outliers(&self) -> Option<&OutlierResult> {
        self.outliers.as_ref()
    }

    pub fn recomposed(&self) -> RecomposedBands {
        time_recompose(self)
    }

    pub fn cleaned(&self) -> CleanedSeries {
        clean_anomalies(self)
    }

    /// Decomposition columns followed by `remainder_l1, remainder_l2, anomaly`.
    pub fn to_time_series(&self) -> Result<TimeSeries> {
        self.decomposition
            .to_time_series()?
            .with_column(columns::REMAINDER_L1, self.remainder_l1.clone())?
            .with_column(columns::REMAINDER_L2, self.remainder_l2.clone())?
            .with_column(columns::ANOMALY, encode(&self.anomaly))
    }
}

impl TryFrom<&TimeSeries> for Anomalized {
    type Error = AnomalyError;

    /// Parse a table produced by [`Anomalized::to_time_series`].
    fn try_from(series: &TimeSeries) -> Result<Self> {
        const COMPONENT: &str = "anomalized table";
        let trend = trend_from_table(series, COMPONENT)?;
        let decomposition = Decomposition::from_parts(
            series.timestamps().to_vec(),
            series
                .require_column(decomposition_columns::OBSERVED, COMPONENT)?
                .to_vec(),
            series
                .require_column(decomposition_columns::SEASON, COMPONENT)?
                .to_vec(),
            trend,
            series
                .require_column(decomposition_columns::REMAINDER, COMPONENT)?
                .to_vec(),
        )?;
        Ok(Self {
            decomposition,
            remainder_l1: series
                .require_column(columns::REMAINDER_L1, COMPONENT)?
                .to_vec(),
            remainder_l2: series
                .require_column(columns::REMAINDER_L2, COMPONENT)?
                .to_vec(),
            anomaly: anomaly_from_table(series, COMPONENT)?,
            outliers: None,
        })
    }
}

/// Anomaly scores for one named column.
#[derive(Debug, Clone)]
pub struct ColumnAnomalies {
    target: String,
    lower: Vec<f64>,
    upper: Vec<f64>,
    anomaly: Vec<Anomaly>,
    outliers: OutlierResult,
}

impl ColumnAnomalies {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomaly
    }

    pub fn outliers(&self) -> &OutlierResult {
        &self.outliers
    }

    /// Append `{target}_l1`, `{target}_l2` and `anomaly` to `series`.
    pub fn merge_into(&self, series: &TimeSeries) -> Result<TimeSeries> {
        series
            .clone()
            .with_column(format!("{}_l1", self.target), self.lower.clone())?
            .with_column(format!("{}_l2", self.target), self.upper.clone())?
            .with_column(columns::ANOMALY, encode(&self.anomaly))
    }
}

/// Score the remainder of a decomposition.
pub fn anomalize(decomposition: &Decomposition, config: &AnomalizeConfig) -> Result<Anomalized> {
    let outliers = score(decomposition.remainder(), config)?;
    let n = decomposition.len();
    let CriticalLimits { lower, upper } = outliers.critical_limits;

    Ok(Anomalized {
        decomposition: decomposition.clone(),
        remainder_l1: vec![lower; n],
        remainder_l2: vec![upper; n],
        anomaly: outliers.classification.clone(),
        outliers: Some(outliers),
    })
}

/// Score any numeric column of a series.
pub fn anomalize_column(
    series: &TimeSeries,
    target: &str,
    config: &AnomalizeConfig,
) -> Result<ColumnAnomalies> {
    let values = series.require_column(target, "anomalize")?;
    let outliers = score(values, config)?;
    let n = values.len();
    let CriticalLimits { lower, upper } = outliers.critical_limits;

    Ok(ColumnAnomalies {
        target: target.to_string(),
        lower: vec![lower; n],
        upper: vec![upper; n],
        anomaly: outliers.classification.clone(),
        outliers,
    })
}

/// Decompose `target` and score its remainder.
pub fn detect_anomalies(
    series: &TimeSeries,
    target: &str,
    decompose: &DecomposeConfig,
    config: &AnomalizeConfig,
) -> Result<Anomalized> {
    let decomposition = time_decompose(series, target, decompose)?;
    anomalize(&decomposition, config)
}

fn score(values: &[f64], config: &AnomalizeConfig) -> Result<OutlierResult> {
    let outliers = config.detector().detect(values)?;
    if config.verbose {
        debug!(
            method = %config.method,
            alpha = config.alpha,
            max_anoms = config.max_anoms,
            anomalies = outliers.outlier_count(),
            "anomalize"
        );
    }
    Ok(outliers)
}

fn encode(anomaly: &[Anomaly]) -> Vec<f64> {
    anomaly.iter().map(|a| a.as_f64()).collect()
}

/// The `trend` or `median_spans` column of a decomposition table.
pub(crate) fn trend_from_table(series: &TimeSeries, component: &str) -> Result<TrendComponent> {
    let trend = series.column(decomposition_columns::TREND);
    let spans = series.column(decomposition_columns::MEDIAN_SPANS);
    match (trend, spans) {
        (Some(t), None) => Ok(TrendComponent::Loess(t.to_vec())),
        (None, Some(m)) => Ok(TrendComponent::MedianSpans(m.to_vec())),
        (Some(_), Some(_)) => Err(AnomalyError::InvalidInput(format!(
            "{}: both `trend` and `median_spans` present",
            component
        ))),
        (None, None) => Err(AnomalyError::InvalidInput(format!(
            "{}: neither `trend` nor `median_spans` present",
            component
        ))),
    }
}

/// Decode the `anomaly` column (`1.0` = Yes, `0.0` = No).
pub(crate) fn anomaly_from_table(series: &TimeSeries, component: &str) -> Result<Vec<Anomaly>> {
    series
        .require_column(columns::ANOMALY, component)?
        .iter()
        .map(|&v| {
            if v == 1.0 {
                Ok(Anomaly::Yes)
            } else if v == 0.0 {
                Ok(Anomaly::No)
            } else {
                Err(AnomalyError::InvalidInput(format!(
                    "{}: `anomaly` must be 0 or 1, got {}",
                    component, v
                )))
            }
        })
        .collect()
}
