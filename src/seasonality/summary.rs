//! Presentation-oriented summaries of a decomposition.
//!
//! - Trend curve as evaluated
//! - Mean weekly effect for Monday through Saturday (clinics are closed on Sunday)
//! - Time-of-day effect over one representative day, clipped to opening hours

use super::Decomposition;
use crate::utils::stats::mean;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;

/// Weekdays reported by the weekly summary, in display order.
pub const REPORTED_WEEKDAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Hour of day at which the intra-day curve starts.
pub const OPENING_HOUR: u32 = 8;
/// Hour of day at which the intra-day curve ends (inclusive).
pub const CLOSING_HOUR: u32 = 19;

fn opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(OPENING_HOUR, 0, 0).unwrap_or_default()
}

fn closing_time() -> NaiveTime {
    NaiveTime::from_hms_opt(CLOSING_HOUR, 0, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub ds: NaiveDateTime,
    pub trend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayEffect {
    pub weekday: Weekday,
    pub effect: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntradayPoint {
    pub time: NaiveTime,
    pub effect: f64,
}

/// Reshaped decomposition ready for plotting or reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub trend: Vec<TrendPoint>,
    pub weekly: Vec<WeekdayEffect>,
    pub intraday: Option<Vec<IntradayPoint>>,
}

/// Summarize a decomposition.
///
/// `frame` supplies the trend and weekly effects. `profile`, when given, is a
/// dense decomposition used for the intra-day curve; only its first calendar
/// day is used.
pub fn summarize(frame: &Decomposition, profile: Option<&Decomposition>) -> ComponentSummary {
    ComponentSummary {
        trend: trend_curve(frame),
        weekly: weekday_effects(frame),
        intraday: profile.and_then(intraday_curve),
    }
}

/// Trend values paired with their timestamps.
pub fn trend_curve(decomposition: &Decomposition) -> Vec<TrendPoint> {
    decomposition
        .timestamps
        .iter()
        .zip(&decomposition.trend)
        .map(|(&ds, &trend)| TrendPoint { ds, trend })
        .collect()
}

/// Mean weekly effect per weekday, Monday through Saturday.
///
/// Weekdays without any evaluated timestamp are omitted.
pub fn weekday_effects(decomposition: &Decomposition) -> Vec<WeekdayEffect> {
    REPORTED_WEEKDAYS
        .iter()
        .filter_map(|&weekday| {
            let effects: Vec<f64> = decomposition
                .timestamps
                .iter()
                .zip(&decomposition.weekly)
                .filter(|(ts, _)| ts.weekday() == weekday)
                .map(|(_, &effect)| effect)
                .collect();
            if effects.is_empty() {
                None
            } else {
                Some(WeekdayEffect {
                    weekday,
                    effect: mean(&effects),
                })
            }
        })
        .collect()
}

/// Time-of-day effect over the first calendar day, within opening hours.
///
/// Returns `None` when the decomposition has no time-of-day component.
pub fn intraday_curve(decomposition: &Decomposition) -> Option<Vec<IntradayPoint>> {
    let daily = decomposition.daily.as_ref()?;
    let day = decomposition.timestamps.first()?.date();
    let (open, close) = (opening_time(), closing_time());
    Some(
        decomposition
            .timestamps
            .iter()
            .zip(daily)
            .filter(|(ts, _)| ts.date() == day)
            .filter(|(ts, _)| ts.time() >= open && ts.time() <= close)
            .map(|(ts, &effect)| IntradayPoint {
                time: ts.time(),
                effect,
            })
            .collect(),
    )
}
