//! Additive component breakdown of a fitted model.

use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;

/// Component values of an additive model evaluated at a set of timestamps.
///
/// The prediction at each timestamp is the sum of all present components.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Timestamps the components were evaluated at.
    pub timestamps: Vec<NaiveDateTime>,
    /// Trend component.
    pub trend: Vec<f64>,
    /// Day-of-week component.
    pub weekly: Vec<f64>,
    /// Time-of-day component, present when the model was fit on sub-daily data.
    pub daily: Option<Vec<f64>>,
    /// Day-of-year component, present when the model had enough history.
    pub yearly: Option<Vec<f64>>,
}

impl Decomposition {
    /// Validate that every component matches the timestamp count.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        trend: Vec<f64>,
        weekly: Vec<f64>,
        daily: Option<Vec<f64>>,
        yearly: Option<Vec<f64>>,
    ) -> Result<Self> {
        let n = timestamps.len();
        let lengths = [Some(trend.len()), Some(weekly.len())]
            .into_iter()
            .chain([daily.as_ref().map(Vec::len), yearly.as_ref().map(Vec::len)]);
        for len in lengths.flatten() {
            if len != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }
        Ok(Self {
            timestamps,
            trend,
            weekly,
            daily,
            yearly,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Sum of all components at each timestamp.
    pub fn total(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.trend[i]
                    + self.weekly[i]
                    + self.daily.as_ref().map_or(0.0, |d| d[i])
                    + self.yearly.as_ref().map_or(0.0, |y| y[i])
            })
            .collect()
    }
}
