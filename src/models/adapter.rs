//! Fitting and prediction over calendar-aware frames.
//!
//! The adapter owns a [`Forecaster`] and builds the timestamp frames it is
//! evaluated on: the training history plus a future horizon of calendar days.

use crate::core::{Forecast, ForecastPoint, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{AdditiveConfig, AdditiveModel, BoxedForecaster, Forecaster};
use crate::seasonality::Decomposition;
use crate::series::TrainingWindow;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest supported forecast horizon, in days.
pub const MAX_HORIZON_DAYS: u32 = 365;

/// Spacing of the intra-day profile grid.
pub const PROFILE_STEP_MINUTES: i64 = 10;

/// Aggregation level the model is fit on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// Daily totals.
    #[default]
    Daily,
    /// Hourly buckets with a time-of-day component.
    SubDaily,
}

/// Which calendar days make up the future horizon.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FutureCalendar {
    #[default]
    AllDays,
    /// Monday through Friday only.
    BusinessDays,
}

impl FutureCalendar {
    pub fn includes(&self, date: NaiveDate) -> bool {
        match self {
            FutureCalendar::AllDays => true,
            FutureCalendar::BusinessDays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

/// Predictions over the history frame and the future horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    forecast: Forecast,
    granularity: Granularity,
    training_end: NaiveDate,
    horizon_days: u32,
}

impl ForecastResult {
    /// Predictions at the model's native granularity.
    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Last date of the history frame.
    pub fn training_end(&self) -> NaiveDate {
        self.training_end
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Predictions as one row per calendar day.
    ///
    /// Sub-daily slots are clamped at zero and summed per date.
    pub fn daily(&self) -> Forecast {
        match self.granularity {
            Granularity::Daily => self.forecast.clone(),
            Granularity::SubDaily => self.forecast.daily_totals(),
        }
    }

    /// Rows dated after the training end.
    pub fn future(&self) -> impl Iterator<Item = ForecastPoint> + '_ {
        self.forecast.after(self.training_end)
    }
}

/// Fits a forecaster on a training series and predicts over history plus horizon.
pub struct ForecastAdapter {
    model: BoxedForecaster,
    granularity: Granularity,
    calendar: FutureCalendar,
}

impl ForecastAdapter {
    pub fn new(model: BoxedForecaster, granularity: Granularity, calendar: FutureCalendar) -> Self {
        Self {
            model,
            granularity,
            calendar,
        }
    }

    /// Adapter over an [`AdditiveModel`], with a time-of-day component for
    /// sub-daily granularity.
    pub fn additive(
        config: AdditiveConfig,
        granularity: Granularity,
        calendar: FutureCalendar,
    ) -> Self {
        let model = AdditiveModel::new(config).with_intraday(granularity == Granularity::SubDaily);
        Self::new(Box::new(model), granularity, calendar)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn model(&self) -> &dyn Forecaster {
        self.model.as_ref()
    }

    /// Fit on `training` and predict over `frame` plus `horizon_days`.
    pub fn fit_and_predict(
        &mut self,
        training: &TimeSeries,
        frame: &TrainingWindow,
        horizon_days: u32,
    ) -> Result<ForecastResult> {
        validate_horizon(horizon_days)?;
        self.model.fit(training)?;

        let mut timestamps = self.history_frame(training, frame);
        let future = self.future_frame(training, frame.end(), horizon_days);
        tracing::debug!(
            model = self.model.name(),
            series = training.label().unwrap_or_default(),
            history = timestamps.len(),
            future = future.len(),
            "predicting"
        );
        timestamps.extend(future);

        let mut forecast = self.model.predict(&timestamps)?;
        if self.granularity == Granularity::SubDaily {
            // Slots predict demand for an active hour; weight by activity rate.
            let activity: BTreeMap<u32, f64> = training.hour_activity().into_iter().collect();
            let end = frame.end();
            forecast.scale_by(|ts| {
                if ts.date() > end {
                    activity.get(&ts.hour()).copied().unwrap_or(0.0)
                } else {
                    1.0
                }
            });
        }

        Ok(ForecastResult {
            forecast,
            granularity: self.granularity,
            training_end: frame.end(),
            horizon_days,
        })
    }

    /// Component breakdown at the given timestamps.
    pub fn decompose(&self, timestamps: &[NaiveDateTime]) -> Result<Decomposition> {
        self.model.decompose(timestamps)
    }

    /// Timestamps covering the training range.
    ///
    /// Daily: every calendar day of the frame. Sub-daily: the observed
    /// training timestamps.
    pub fn history_frame(&self, training: &TimeSeries, frame: &TrainingWindow) -> Vec<NaiveDateTime> {
        match self.granularity {
            Granularity::Daily => frame.dates().map(midnight).collect(),
            Granularity::SubDaily => training.timestamps().to_vec(),
        }
    }

    /// Timestamps in `(end, end + horizon_days]` allowed by the calendar.
    ///
    /// Sub-daily frames repeat every hour of day observed in training; their
    /// predictions are weighted by [`TimeSeries::hour_activity`].
    pub fn future_frame(
        &self,
        training: &TimeSeries,
        end: NaiveDate,
        horizon_days: u32,
    ) -> Vec<NaiveDateTime> {
        let days = (1..=i64::from(horizon_days))
            .map(|offset| end + Duration::days(offset))
            .filter(|&date| self.calendar.includes(date));
        match self.granularity {
            Granularity::Daily => days.map(midnight).collect(),
            Granularity::SubDaily => {
                let hours: Vec<u32> = training
                    .hour_activity()
                    .into_iter()
                    .map(|(hour, _)| hour)
                    .collect();
                days.flat_map(|date| {
                    hours
                        .iter()
                        .filter_map(move |&hour| date.and_hms_opt(hour, 0, 0))
                        .collect::<Vec<_>>()
                })
                .collect()
            }
        }
    }
}

/// Reject horizons outside `1..=MAX_HORIZON_DAYS`.
pub fn validate_horizon(horizon_days: u32) -> Result<()> {
    if horizon_days == 0 || horizon_days > MAX_HORIZON_DAYS {
        return Err(ForecastError::InvalidParameter(format!(
            "horizon must be between 1 and {} days, got {}",
            MAX_HORIZON_DAYS, horizon_days
        )));
    }
    Ok(())
}

/// A dense grid over one calendar day, used to draw the time-of-day profile.
pub fn profile_grid(date: NaiveDate) -> Vec<NaiveDateTime> {
    let start = midnight(date);
    (0..24 * 60 / PROFILE_STEP_MINUTES)
        .map(|i| start + Duration::minutes(i * PROFILE_STEP_MINUTES))
        .collect()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn daily_series(start: NaiveDate, n: i64, skip_every: i64) -> TimeSeries {
        let (timestamps, values): (Vec<_>, Vec<_>) = (0..n)
            .filter(|i| skip_every == 0 || i % skip_every != 0)
            .map(|i| (midnight(start + Duration::days(i)), 10.0 + (i % 5) as f64))
            .unzip();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn daily_result_covers_every_day_of_frame_and_horizon() {
        let training = daily_series(date(1, 1), 60, 4);
        let frame = TrainingWindow::new(date(1, 1), date(2, 29)).unwrap();
        let mut adapter = ForecastAdapter::additive(
            AdditiveConfig::default(),
            Granularity::Daily,
            FutureCalendar::AllDays,
        );

        let result = adapter.fit_and_predict(&training, &frame, 14).unwrap();
        assert_eq!(result.forecast().len(), 60 + 14);
        assert_eq!(result.future().count(), 14);
        assert_eq!(
            result.forecast().timestamps().last().unwrap().date(),
            date(3, 14)
        );
        assert_eq!(result.daily(), *result.forecast());
        assert_eq!(result.horizon_days(), 14);
        assert_eq!(result.training_end(), date(2, 29));
    }

    #[test]
    fn business_calendar_skips_weekends() {
        let training = daily_series(date(1, 1), 30, 0);
        let frame = TrainingWindow::new(date(1, 1), date(1, 30)).unwrap();
        let mut adapter = ForecastAdapter::additive(
            AdditiveConfig::default(),
            Granularity::Daily,
            FutureCalendar::BusinessDays,
        );

        let result = adapter.fit_and_predict(&training, &frame, 14).unwrap();
        let future: Vec<_> = result.future().collect();
        assert_eq!(future.len(), 10);
        assert!(future
            .iter()
            .all(|row| !matches!(row.ds.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn sub_daily_future_repeats_observed_hours() {
        let timestamps: Vec<_> = (0..21)
            .flat_map(|d| {
                [9, 13, 16].map(|h| midnight(date(1, 1) + Duration::days(d)) + Duration::hours(h))
            })
            .collect();
        let values = timestamps
            .iter()
            .map(|ts| if ts.hour() == 9 { 6.0 } else { 2.0 })
            .collect();
        let training = TimeSeries::new(timestamps, values).unwrap();
        let frame = TrainingWindow::new(date(1, 1), date(1, 21)).unwrap();
        let mut adapter = ForecastAdapter::additive(
            AdditiveConfig::default(),
            Granularity::SubDaily,
            FutureCalendar::AllDays,
        );

        let result = adapter.fit_and_predict(&training, &frame, 7).unwrap();
        assert_eq!(result.future().count(), 7 * 3);

        let daily = result.daily();
        assert_eq!(daily.len(), 21 + 7);
        assert!(daily.timestamps().iter().all(|ts| ts.time() == NaiveTime::MIN));
        assert!(daily.point().iter().all(|&v| v >= 0.0));
        assert!((daily.point()[27] - 10.0).abs() < 1.0);

        let profile = adapter.decompose(&profile_grid(date(1, 21))).unwrap();
        assert!(profile.daily.is_some());
    }

    #[test]
    fn occasional_hours_are_weighted_by_how_often_they_occur() {
        // 10 units at 09:00 every day, 10 more at 18:00 on 3 of 90 days.
        let timestamps: Vec<_> = (0..90)
            .flat_map(|d| {
                let day = midnight(date(1, 1) + Duration::days(d));
                let mut slots = vec![day + Duration::hours(9)];
                if d % 30 == 0 {
                    slots.push(day + Duration::hours(18));
                }
                slots
            })
            .collect();
        let values = vec![10.0; timestamps.len()];
        let training = TimeSeries::new(timestamps, values).unwrap();
        let frame = TrainingWindow::new(date(1, 1), date(3, 30)).unwrap();
        let mut adapter = ForecastAdapter::additive(
            AdditiveConfig::default(),
            Granularity::SubDaily,
            FutureCalendar::AllDays,
        );

        let result = adapter.fit_and_predict(&training, &frame, 30).unwrap();
        assert_eq!(result.future().count(), 30 * 2);

        let future: Vec<f64> = result.daily().after(date(3, 30)).map(|r| r.yhat).collect();
        assert_eq!(future.len(), 30);
        let mean = future.iter().sum::<f64>() / future.len() as f64;
        assert_relative_eq!(mean, 10.0 + 10.0 / 30.0, epsilon = 0.5);

        // History rows are observations and stay unweighted.
        let history = result.daily();
        assert_relative_eq!(history.point()[0], 20.0, epsilon = 1.0);
    }

    #[test]
    fn horizon_outside_range_is_rejected() {
        let training = daily_series(date(1, 1), 10, 0);
        let frame = TrainingWindow::new(date(1, 1), date(1, 10)).unwrap();
        let mut adapter = ForecastAdapter::additive(
            AdditiveConfig::default(),
            Granularity::Daily,
            FutureCalendar::AllDays,
        );
        for horizon in [0, MAX_HORIZON_DAYS + 1] {
            assert!(matches!(
                adapter.fit_and_predict(&training, &frame, horizon),
                Err(ForecastError::InvalidParameter(_))
            ));
        }
        assert!(!adapter.model().is_fitted());
    }

    #[test]
    fn profile_grid_spans_one_day() {
        let grid = profile_grid(date(5, 2));
        assert_eq!(grid.len(), 144);
        assert!(grid.iter().all(|ts| ts.date() == date(5, 2)));
        assert_eq!(grid[1] - grid[0], Duration::minutes(10));
    }
}
