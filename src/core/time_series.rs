//! TimeSeries data structure for representing observed demand.

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

/// A univariate time series with strictly increasing timestamps.
///
/// Timestamps are not required to be regularly spaced: a missing day is a
/// missing observation, never an implicit zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
    label: Option<String>,
}

impl TimeSeries {
    /// Create a new series, validating ordering and lengths.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if values.len() != timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            timestamps,
            values,
            label: None,
        })
    }

    /// Attach a display label (usually the drug name).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// First observed timestamp.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    /// Last observed timestamp.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Iterate over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Number of calendar days covered, counting both ends.
    pub fn span_days(&self) -> i64 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => (last.date() - first.date()).num_days() + 1,
            _ => 0,
        }
    }

    /// Share of observed days on which each hour of the day has an observation.
    ///
    /// Hours are ascending; hours never observed are absent.
    pub fn hour_activity(&self) -> Vec<(u32, f64)> {
        let mut hours: BTreeMap<u32, BTreeSet<NaiveDate>> = BTreeMap::new();
        let mut days = BTreeSet::new();
        for ts in &self.timestamps {
            hours.entry(ts.hour()).or_default().insert(ts.date());
            days.insert(ts.date());
        }
        let days = days.len() as f64;
        hours
            .into_iter()
            .map(|(hour, active)| (hour, active.len() as f64 / days))
            .collect()
    }
}
