//! Forecasting models.

mod traits;

pub mod adapter;
pub mod additive;

pub use adapter::{
    profile_grid, validate_horizon, FutureCalendar, ForecastAdapter, ForecastResult, Granularity,
    MAX_HORIZON_DAYS,
};
pub use additive::{AdditiveConfig, AdditiveModel, YearlySeasonality};
pub use traits::{BoxedForecaster, Forecaster};
