//! Stock depletion from cumulative forecast demand.
//!
//! Demand after the training window is clamped at zero and accumulated day by
//! day. The first date on which the running total reaches the starting stock
//! is the depletion date. Nothing is extrapolated past the forecast horizon.

use crate::core::Forecast;
use chrono::NaiveDate;
use serde::Serialize;

/// Outcome of a depletion estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DepletionEstimate {
    /// Cumulative demand reached the stock on `date`.
    Depleted {
        stock: u64,
        date: NaiveDate,
        /// Whole days from the window end to `date`.
        days_elapsed: i64,
        /// Cumulative demand on `date`.
        cumulative: f64,
    },
    /// The stock outlasts the forecast horizon.
    NotDepletedWithinHorizon {
        stock: u64,
        /// Days from the window end to the last forecast date.
        horizon_days: i64,
        cumulative_total: f64,
    },
}

impl DepletionEstimate {
    pub fn is_depleted(&self) -> bool {
        matches!(self, DepletionEstimate::Depleted { .. })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DepletionEstimate::Depleted { date, .. } => Some(*date),
            DepletionEstimate::NotDepletedWithinHorizon { .. } => None,
        }
    }
}

/// Running total of clamped demand for every date after `window_end`.
pub fn cumulative_curve(daily: &Forecast, window_end: NaiveDate) -> Vec<(NaiveDate, f64)> {
    daily
        .after(window_end)
        .scan(0.0, |total, row| {
            *total += row.yhat.max(0.0);
            Some((row.ds.date(), *total))
        })
        .collect()
}

/// Estimate when `stock` units run out under the daily forecast.
///
/// A cumulative total exactly equal to the stock depletes on that date.
pub fn estimate(daily: &Forecast, window_end: NaiveDate, stock: u64) -> DepletionEstimate {
    let curve = cumulative_curve(daily, window_end);
    let target = stock as f64;

    if let Some(&(date, cumulative)) = curve.iter().find(|(_, total)| *total >= target) {
        let days_elapsed = (date - window_end).num_days();
        tracing::debug!(%date, days_elapsed, cumulative, stock, "stock depleted");
        return DepletionEstimate::Depleted {
            stock,
            date,
            days_elapsed,
            cumulative,
        };
    }

    let (horizon_days, cumulative_total) = curve
        .last()
        .map(|&(date, total)| ((date - window_end).num_days(), total))
        .unwrap_or((0, 0.0));
    tracing::debug!(horizon_days, cumulative_total, stock, "stock not depleted within horizon");
    DepletionEstimate::NotDepletedWithinHorizon {
        stock,
        horizon_days,
        cumulative_total,
    }
}
