//! Additive trend + seasonality model.
//!
//! The series is modelled as
//!
//! ```text
//! y(t) = g(t) + s_weekly(t) + s_daily(t) + s_yearly(t) + e
//! ```
//!
//! - `g` is a piecewise-linear trend with changepoints spread over the first
//!   part of the history
//! - each `s` is a Fourier series in days since the Unix epoch
//! - all coefficients are solved jointly by penalized least squares
//!
//! Time is measured in real elapsed seconds, so gaps in the history (days
//! without prescriptions) need no imputation.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::seasonality::Decomposition;
use crate::utils::ols::ridge_fit;
use crate::utils::stats::{interval_z, std_dev};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;

const SECONDS_PER_DAY: f64 = 86_400.0;
const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;

/// Minimum history, in days, for automatic yearly seasonality.
pub const YEARLY_AUTO_MIN_DAYS: i64 = 730;

/// Whether the model includes a day-of-year component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YearlySeasonality {
    /// Enabled when the training history spans at least two years.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Hyperparameters of [`AdditiveModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    /// Maximum number of trend changepoints.
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    /// Ridge penalty on changepoint slope adjustments.
    pub changepoint_penalty: f64,
    /// Ridge penalty on Fourier coefficients.
    pub seasonality_penalty: f64,
    pub weekly_order: usize,
    pub daily_order: usize,
    pub yearly_order: usize,
    pub yearly: YearlySeasonality,
    /// Central coverage of the uncertainty interval.
    pub interval_width: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_penalty: 5.0,
            seasonality_penalty: 0.01,
            weekly_order: 3,
            daily_order: 4,
            yearly_order: 10,
            yearly: YearlySeasonality::Auto,
            interval_width: 0.8,
        }
    }
}

impl AdditiveConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        for (name, penalty) in [
            ("changepoint_penalty", self.changepoint_penalty),
            ("seasonality_penalty", self.seasonality_penalty),
        ] {
            if !(penalty.is_finite() && penalty >= 0.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be a non-negative number, got {}",
                    name, penalty
                )));
            }
        }
        interval_z(self.interval_width).map(|_| ())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Weekly,
    Daily,
    Yearly,
}

#[derive(Debug, Clone, Copy)]
struct SeasonalTerm {
    component: Component,
    period_days: f64,
    order: usize,
}

/// Everything needed to evaluate the model at new timestamps.
#[derive(Debug, Clone)]
struct FittedState {
    start: NaiveDateTime,
    span_seconds: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    terms: Vec<SeasonalTerm>,
    coefficients: Vec<f64>,
    /// Residual standard deviation in original units.
    sigma: f64,
    z: f64,
}

impl FittedState {
    fn scaled_time(&self, ts: NaiveDateTime) -> f64 {
        (ts - self.start).num_seconds() as f64 / self.span_seconds
    }

    fn design(&self, timestamps: &[NaiveDateTime]) -> Vec<Vec<f64>> {
        let t: Vec<f64> = timestamps.iter().map(|&ts| self.scaled_time(ts)).collect();
        design_columns(&t, timestamps, &self.changepoints, &self.terms)
    }

    fn contribution(&self, columns: &[Vec<f64>], range: Range<usize>, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        for j in range {
            let coef = self.coefficients[j];
            for (o, x) in out.iter_mut().zip(&columns[j]) {
                *o += coef * x;
            }
        }
        out.iter_mut().for_each(|v| *v *= self.y_scale);
        out
    }

    fn decompose(&self, timestamps: &[NaiveDateTime]) -> Result<Decomposition> {
        let n = timestamps.len();
        let columns = self.design(timestamps);

        let trend_end = 2 + self.changepoints.len();
        let trend = self.contribution(&columns, 0..trend_end, n);

        let mut weekly = vec![0.0; n];
        let mut daily = None;
        let mut yearly = None;
        let mut offset = trend_end;
        for term in &self.terms {
            let width = 2 * term.order;
            let values = self.contribution(&columns, offset..offset + width, n);
            offset += width;
            match term.component {
                Component::Weekly => weekly = values,
                Component::Daily => daily = Some(values),
                Component::Yearly => yearly = Some(values),
            }
        }

        Decomposition::new(timestamps.to_vec(), trend, weekly, daily, yearly)
    }
}

/// Piecewise-linear trend plus Fourier seasonalities, fit by ridge regression.
///
/// # Example
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use rx_forecast::core::TimeSeries;
/// use rx_forecast::models::{AdditiveModel, Forecaster};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..30).map(|i| start + Duration::days(i)).collect();
/// let values: Vec<f64> = (0..30).map(|i| 20.0 + i as f64).collect();
/// let series = TimeSeries::new(timestamps, values).unwrap();
///
/// let mut model = AdditiveModel::default();
/// model.fit(&series).unwrap();
///
/// let forecast = model.predict(&[start + Duration::days(30)]).unwrap();
/// assert!((forecast.point()[0] - 50.0).abs() < 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdditiveModel {
    config: AdditiveConfig,
    intraday: bool,
    state: Option<FittedState>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl AdditiveModel {
    /// Create a model with the given hyperparameters.
    pub fn new(config: AdditiveConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Include a time-of-day component (for sub-daily data).
    pub fn with_intraday(mut self, intraday: bool) -> Self {
        self.intraday = intraday;
        self
    }

    pub fn config(&self) -> &AdditiveConfig {
        &self.config
    }

    pub fn has_intraday(&self) -> bool {
        self.intraday
    }

    /// In-sample residual standard deviation, once fitted.
    pub fn sigma(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.sigma)
    }

    /// Number of trend changepoints placed during fitting.
    pub fn n_changepoints(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.changepoints.len())
    }

    fn seasonal_terms(&self, span_days: i64) -> Vec<SeasonalTerm> {
        let yearly = match self.config.yearly {
            YearlySeasonality::Auto => span_days >= YEARLY_AUTO_MIN_DAYS,
            YearlySeasonality::Enabled => true,
            YearlySeasonality::Disabled => false,
        };
        [
            (true, Component::Weekly, WEEK_DAYS, self.config.weekly_order),
            (self.intraday, Component::Daily, 1.0, self.config.daily_order),
            (yearly, Component::Yearly, YEAR_DAYS, self.config.yearly_order),
        ]
        .into_iter()
        .filter(|&(active, _, _, order)| active && order > 0)
        .map(|(_, component, period_days, order)| SeasonalTerm {
            component,
            period_days,
            order,
        })
        .collect()
    }

    fn state(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(ForecastError::FitRequired)
    }
}

/// Changepoint locations in scaled time.
///
/// Evenly spaced over the first `range` fraction of observations, located
/// on observed timestamps.
fn place_changepoints(t: &[f64], n_changepoints: usize, range: f64) -> Vec<f64> {
    let hist_size = (t.len() as f64 * range).floor() as usize;
    let n = n_changepoints.min(hist_size.saturating_sub(1));
    if n == 0 {
        return Vec::new();
    }
    let step = (hist_size - 1) as f64 / n as f64;
    let mut changepoints: Vec<f64> = (1..=n)
        .map(|i| t[(i as f64 * step).round() as usize])
        .collect();
    changepoints.dedup();
    changepoints
}

/// Fourier columns `[sin(2πk d/P), cos(2πk d/P)]` for `k = 1..=order`.
fn fourier_columns(days: &[f64], period_days: f64, order: usize) -> Vec<Vec<f64>> {
    let mut columns = Vec::with_capacity(2 * order);
    for k in 1..=order {
        let freq = 2.0 * PI * k as f64 / period_days;
        columns.push(days.iter().map(|d| (freq * d).sin()).collect());
        columns.push(days.iter().map(|d| (freq * d).cos()).collect());
    }
    columns
}

/// Column layout: intercept, slope, changepoint hinges, then each seasonal term.
fn design_columns(
    t: &[f64],
    timestamps: &[NaiveDateTime],
    changepoints: &[f64],
    terms: &[SeasonalTerm],
) -> Vec<Vec<f64>> {
    let mut columns = Vec::new();
    columns.push(vec![1.0; t.len()]);
    columns.push(t.to_vec());
    for &cp in changepoints {
        columns.push(t.iter().map(|&ti| (ti - cp).max(0.0)).collect());
    }

    let days: Vec<f64> = timestamps
        .iter()
        .map(|ts| ts.and_utc().timestamp() as f64 / SECONDS_PER_DAY)
        .collect();
    for term in terms {
        columns.extend(fourier_columns(&days, term.period_days, term.order));
    }
    columns
}

impl Forecaster for AdditiveModel {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.config.validate()?;
        let z = interval_z(self.config.interval_width)?;

        let n = series.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData { needed: 2, got: n });
        }
        let values = series.values();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "series contains non-finite values".into(),
            ));
        }

        let timestamps = series.timestamps();
        let start = timestamps[0];
        let span_seconds = (timestamps[n - 1] - start).num_seconds() as f64;
        if span_seconds <= 0.0 {
            return Err(ForecastError::TimestampError(
                "series must span at least one second".into(),
            ));
        }

        let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

        let mut state = FittedState {
            start,
            span_seconds,
            y_scale,
            changepoints: Vec::new(),
            terms: self.seasonal_terms(series.span_days()),
            coefficients: Vec::new(),
            sigma: 0.0,
            z,
        };
        let t: Vec<f64> = timestamps.iter().map(|&ts| state.scaled_time(ts)).collect();
        state.changepoints = place_changepoints(
            &t,
            self.config.n_changepoints,
            self.config.changepoint_range,
        );

        let columns = design_columns(&t, timestamps, &state.changepoints, &state.terms);
        // Intercept and slope are unpenalized.
        let mut penalties = vec![0.0, 0.0];
        penalties.resize(2 + state.changepoints.len(), self.config.changepoint_penalty);
        penalties.resize(columns.len(), self.config.seasonality_penalty);

        let ols = ridge_fit(&y, &columns, &penalties)?;
        let fitted_scaled = ols.predict(&columns)?;
        state.coefficients = ols.coefficients;

        let residuals_scaled: Vec<f64> = y
            .iter()
            .zip(&fitted_scaled)
            .map(|(actual, fit)| actual - fit)
            .collect();
        let sigma = std_dev(&residuals_scaled);
        state.sigma = if sigma.is_finite() { sigma * y_scale } else { 0.0 };

        let fitted: Vec<f64> = fitted_scaled.iter().map(|v| v * y_scale).collect();
        let residuals = values
            .iter()
            .zip(&fitted)
            .map(|(actual, fit)| actual - fit)
            .collect();

        tracing::debug!(
            observations = n,
            changepoints = state.changepoints.len(),
            seasonal_terms = state.terms.len(),
            sigma = state.sigma,
            "fitted additive model"
        );

        self.state = Some(state);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, timestamps: &[NaiveDateTime]) -> Result<Forecast> {
        let state = self.state()?;
        let point = state.decompose(timestamps)?.total();

        let (lower, upper): (Vec<f64>, Vec<f64>) = timestamps
            .iter()
            .zip(&point)
            .map(|(&ts, &yhat)| {
                let beyond = (state.scaled_time(ts) - 1.0).max(0.0);
                let half_width = state.z * state.sigma * (1.0 + beyond).sqrt();
                (yhat - half_width, yhat + half_width)
            })
            .unzip();

        Forecast::from_values_with_intervals(timestamps.to_vec(), point, lower, upper)
    }

    fn decompose(&self, timestamps: &[NaiveDateTime]) -> Result<Decomposition> {
        self.state()?.decompose(timestamps)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "Additive"
    }
}
