//! Forecaster trait defining the common interface for additive models.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;
use crate::seasonality::Decomposition;
use chrono::NaiveDateTime;

/// Common interface for forecasting models.
///
/// Predictions are requested for explicit timestamps rather than a step count,
/// so irregular history and calendar-aware future frames are both supported.
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Point estimates and interval bounds at the given timestamps.
    fn predict(&self, timestamps: &[NaiveDateTime]) -> Result<Forecast>;

    /// Additive components at the given timestamps.
    fn decompose(&self, timestamps: &[NaiveDateTime]) -> Result<Decomposition>;

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use rx_forecast::models::{AdditiveModel, BoxedForecaster, Forecaster};
///
/// let model: BoxedForecaster = Box::new(AdditiveModel::default());
/// assert_eq!(model.name(), "Additive");
/// assert!(!model.is_fitted());
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;
