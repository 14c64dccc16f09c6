//! Seasonal decomposition results and their summaries.
//!
//! This module provides tools for inspecting seasonal patterns of a fitted model:
//! - Decomposition: trend, weekly, time-of-day and yearly components
//! - Summary: weekday means and an opening-hours time-of-day curve

mod decomposition;
mod summary;

pub use decomposition::Decomposition;
pub use summary::{
    intraday_curve, summarize, trend_curve, weekday_effects, ComponentSummary, IntradayPoint,
    TrendPoint, WeekdayEffect, CLOSING_HOUR, OPENING_HOUR, REPORTED_WEEKDAYS,
};
