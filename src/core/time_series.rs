//! TimeSeries data structure: a timestamp index with named value columns.

use crate::core::TimeScale;
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, Utc};

/// Default column label for univariate series.
pub const DEFAULT_LABEL: &str = "value";

/// A time series with a strictly increasing timestamp index and one or more
/// labelled value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    /// Values stored in column-major format: values[column][observation]
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
}

impl TimeSeries {
    /// Create a new TimeSeries from column-major `values`.
    ///
    /// Empty `labels` assigns defaults: `"value"` for a single column,
    /// `"value_0"`, `"value_1"`, ... otherwise.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
        labels: Vec<String>,
    ) -> Result<Self> {
        // Validate timestamps are strictly increasing
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(AnomalyError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        for column in &values {
            if column.len() != timestamps.len() {
                return Err(AnomalyError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: column.len(),
                });
            }
        }

        let labels = if labels.is_empty() {
            default_labels(values.len())
        } else {
            labels
        };

        if labels.len() != values.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: values.len(),
                got: labels.len(),
            });
        }

        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(AnomalyError::InvalidInput(format!(
                    "duplicate column label `{}`",
                    label
                )));
            }
        }

        Ok(Self {
            timestamps,
            values,
            labels,
        })
    }

    /// Create a simple univariate time series labelled `"value"`.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        Self::new(timestamps, vec![values], vec![])
    }

    /// Create a series from named columns.
    pub fn from_columns(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let (labels, values): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        if labels.is_empty() {
            return Err(AnomalyError::InvalidInput(
                "a series needs at least one column".to_string(),
            ));
        }
        Self::new(timestamps, values, labels)
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether a column with this label exists.
    pub fn has_column(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Look up a column by label.
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i].as_slice())
    }

    /// Look up a column by label, naming the calling component on failure.
    pub fn require_column(&self, label: &str, component: &str) -> Result<&[f64]> {
        self.column(label).ok_or_else(|| {
            AnomalyError::InvalidInput(format!(
                "{}: target column `{}` missing",
                component, label
            ))
        })
    }

    /// Return a copy with the column set. An existing column with the same
    /// label is replaced in place; otherwise the column is appended.
    pub fn with_column(mut self, label: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        let label = label.into();
        match self.labels.iter().position(|l| *l == label) {
            Some(i) => self.values[i] = values,
            None => {
                self.labels.push(label);
                self.values.push(values);
            }
        }
        Ok(self)
    }

    /// Extract a slice of the time series.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(AnomalyError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(AnomalyError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self
                .values
                .iter()
                .map(|col| col[start..end].to_vec())
                .collect(),
            labels: self.labels.clone(),
        })
    }

    /// Infer the sampling scale from the median spacing of the index.
    pub fn time_scale(&self) -> Result<TimeScale> {
        TimeScale::infer(&self.timestamps)
    }
}

fn default_labels(columns: usize) -> Vec<String> {
    match columns {
        0 => Vec::new(),
        1 => vec![DEFAULT_LABEL.to_string()],
        n => (0..n).map(|i| format!("{}_{}", DEFAULT_LABEL, i)).collect(),
    }
}
