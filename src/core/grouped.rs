//! Collections of independent series sharing one container.
//!
//! Every core operation is single-series. [`GroupedSeries`] applies an
//! operation once per group, in group order, and keeps each group's rows in
//! their original order.

use crate::core::TimeSeries;
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, Utc};

/// A single series tagged with its group key.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    pub key: String,
    pub series: TimeSeries,
}

/// An ordered set of keyed series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSeries {
    groups: Vec<SeriesGroup>,
}

impl GroupedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Keys must be unique.
    pub fn push(&mut self, key: impl Into<String>, series: TimeSeries) -> Result<()> {
        let key = key.into();
        if self.groups.iter().any(|g| g.key == key) {
            return Err(AnomalyError::InvalidInput(format!(
                "duplicate group key `{}`",
                key
            )));
        }
        self.groups.push(SeriesGroup { key, series });
        Ok(())
    }

    /// Build groups from long-format rows. Groups appear in order of first
    /// appearance; rows keep their relative order within a group.
    pub fn from_long(
        keys: &[String],
        timestamps: &[DateTime<Utc>],
        values: &[f64],
        label: &str,
    ) -> Result<Self> {
        if keys.len() != timestamps.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: keys.len(),
                got: timestamps.len(),
            });
        }
        if keys.len() != values.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: keys.len(),
                got: values.len(),
            });
        }

        let mut order: Vec<&String> = Vec::new();
        let mut rows: Vec<(Vec<DateTime<Utc>>, Vec<f64>)> = Vec::new();
        for ((key, ts), value) in keys.iter().zip(timestamps).zip(values) {
            let slot = match order.iter().position(|k| *k == key) {
                Some(slot) => slot,
                None => {
                    order.push(key);
                    rows.push((Vec::new(), Vec::new()));
                    rows.len() - 1
                }
            };
            rows[slot].0.push(*ts);
            rows[slot].1.push(*value);
        }

        let mut grouped = Self::new();
        for (key, (ts, vals)) in order.into_iter().zip(rows) {
            let series = TimeSeries::from_columns(ts, vec![(label.to_string(), vals)])?;
            grouped.push(key.clone(), series)?;
        }
        Ok(grouped)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[SeriesGroup] {
        &self.groups
    }

    pub fn get(&self, key: &str) -> Option<&TimeSeries> {
        self.groups.iter().find(|g| g.key == key).map(|g| &g.series)
    }

    /// Total number of rows across all groups.
    pub fn total_rows(&self) -> usize {
        self.groups.iter().map(|g| g.series.len()).sum()
    }

    /// Apply `f` to every group in order. The first failing group aborts the
    /// batch and its key is attached to the error.
    pub fn map<T, F>(&self, mut f: F) -> Result<Vec<(String, T)>>
    where
        F: FnMut(&TimeSeries) -> Result<T>,
    {
        self.groups
            .iter()
            .map(|g| {
                f(&g.series)
                    .map(|out| (g.key.clone(), out))
                    .map_err(|err| with_group_context(err, &g.key))
            })
            .collect()
    }
}

fn with_group_context(err: AnomalyError, key: &str) -> AnomalyError {
    match err {
        AnomalyError::InvalidInput(msg) => {
            AnomalyError::InvalidInput(format!("group `{}`: {}", key, msg))
        }
        AnomalyError::InvalidParameter(msg) => {
            AnomalyError::InvalidParameter(format!("group `{}`: {}", key, msg))
        }
        AnomalyError::Unsupported(msg) => {
            AnomalyError::Unsupported(format!("group `{}`: {}", key, msg))
        }
        other => other,
    }
}
