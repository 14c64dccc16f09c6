//! Error types for the rx-forecast library.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while preparing data, fitting or estimating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// A required column is absent from the record source.
    #[error("column '{0}' not found in the record source")]
    InputShape(String),

    /// No positive observation exists for the drug code.
    #[error("no prescription records for code '{code}'")]
    NoData { code: String },

    /// Observations exist, but none inside the training window.
    #[error("no prescription records for code '{code}' between {start} and {end}")]
    NoDataInWindow {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Training window start is later than its end.
    #[error("training window start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Reading or writing a table failed.
    #[error("table error: {0}")]
    Table(String),
}

impl ForecastError {
    /// Whether the error stems from the operator's input rather than the model.
    ///
    /// Precondition failures end a run before any output is produced.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ForecastError::InputShape(_)
                | ForecastError::NoData { .. }
                | ForecastError::NoDataInWindow { .. }
                | ForecastError::InvalidWindow { .. }
                | ForecastError::InvalidParameter(_)
        )
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Table(err.to_string())
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Table(err.to_string())
    }
}

impl From<calamine::Error> for ForecastError {
    fn from(err: calamine::Error) -> Self {
        ForecastError::Table(err.to_string())
    }
}
