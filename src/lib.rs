//! # rx-forecast
//!
//! Prescription volume forecasting from clinic visit records.
//!
//! Raw visit rows are normalized into a daily (or hourly) demand series for
//! one drug code, fit with an additive trend + seasonality model, and turned
//! into a future forecast, a component summary and a stock depletion date.

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod depletion;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod seasonality;
pub mod series;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, ForecastPoint, TimeSeries};
    pub use crate::depletion::DepletionEstimate;
    pub use crate::error::{ForecastError, Result};
    pub use crate::ingest::{DrugDirectory, RecordSet, TextEncoding, TimestampFormat};
    pub use crate::models::{AdditiveModel, Forecaster, FutureCalendar, Granularity};
    pub use crate::pipeline::{run, RunConfig, RunOutcome};
    pub use crate::series::{SeriesBuilder, TrainingWindow};
}
