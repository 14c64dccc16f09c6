//! Forecast result structure for holding dated predictions.

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// One predicted point: estimate plus uncertainty bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub ds: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Point predictions and interval bounds over a set of timestamps.
///
/// Covers the fitted history as well as the future horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    timestamps: Vec<NaiveDateTime>,
    point: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast with prediction intervals.
    pub fn from_values_with_intervals(
        timestamps: Vec<NaiveDateTime>,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        for len in [point.len(), lower.len(), upper.len()] {
            if len != timestamps.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: len,
                });
            }
        }
        Ok(Self {
            timestamps,
            point,
            lower,
            upper,
        })
    }

    /// Number of predicted timestamps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Point estimates (`yhat`).
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Lower interval bounds (`yhat_lower`).
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper interval bounds (`yhat_upper`).
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Iterate over rows in timestamp order.
    pub fn rows(&self) -> impl Iterator<Item = ForecastPoint> + '_ {
        (0..self.len()).map(move |i| ForecastPoint {
            ds: self.timestamps[i],
            yhat: self.point[i],
            yhat_lower: self.lower[i],
            yhat_upper: self.upper[i],
        })
    }

    /// Rows dated strictly after `date`.
    pub fn after(&self, date: NaiveDate) -> impl Iterator<Item = ForecastPoint> + '_ {
        self.rows().filter(move |row| row.ds.date() > date)
    }

    /// Multiply each row's estimate and bounds by `factor(ds)`.
    pub fn scale_by<F: Fn(NaiveDateTime) -> f64>(&mut self, factor: F) {
        for i in 0..self.len() {
            let f = factor(self.timestamps[i]);
            self.point[i] *= f;
            self.lower[i] *= f;
            self.upper[i] *= f;
        }
    }

    /// Collapse sub-daily rows into daily totals.
    ///
    /// Each slot is clamped at zero before summing, since prescription counts
    /// cannot be negative. Bounds are summed the same way.
    pub fn daily_totals(&self) -> Forecast {
        let mut days: BTreeMap<NaiveDate, [f64; 3]> = BTreeMap::new();
        for row in self.rows() {
            let entry = days.entry(row.ds.date()).or_insert([0.0; 3]);
            entry[0] += row.yhat.max(0.0);
            entry[1] += row.yhat_lower.max(0.0);
            entry[2] += row.yhat_upper.max(0.0);
        }

        let mut daily = Forecast::new();
        for (date, [yhat, lower, upper]) in days {
            daily.timestamps.push(date.and_time(chrono::NaiveTime::MIN));
            daily.point.push(yhat);
            daily.lower.push(lower);
            daily.upper.push(upper);
        }
        daily
    }

    /// Write rows as CSV with a `ds,yhat,yhat_lower,yhat_upper` header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
