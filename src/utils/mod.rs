//! Utility functions for forecasting models.

pub mod ols;
pub mod stats;

pub use ols::{ridge_fit, OLSResult};
pub use stats::interval_z;
