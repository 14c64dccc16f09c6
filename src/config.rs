//! Configuration loading and validation.

use crate::ingest::{
    TextEncoding, TimestampFormat, DEFAULT_CODE_COLUMN, DEFAULT_NAME_COLUMN,
    DEFAULT_TIMESTAMP_COLUMN,
};
use crate::models::{validate_horizon, AdditiveConfig, FutureCalendar, Granularity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Layout of the input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Visit table column holding the visit timestamp.
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Lookup table column holding drug codes.
    #[serde(default = "default_code_column")]
    pub code_column: String,

    /// Lookup table column holding display names.
    #[serde(default = "default_name_column")]
    pub name_column: String,

    #[serde(default)]
    pub timestamp_format: TimestampFormat,

    /// Encoding of CSV tables.
    #[serde(default)]
    pub encoding: TextEncoding,
}

fn default_timestamp_column() -> String {
    DEFAULT_TIMESTAMP_COLUMN.to_string()
}

fn default_code_column() -> String {
    DEFAULT_CODE_COLUMN.to_string()
}

fn default_name_column() -> String {
    DEFAULT_NAME_COLUMN.to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            timestamp_column: default_timestamp_column(),
            code_column: default_code_column(),
            name_column: default_name_column(),
            timestamp_format: TimestampFormat::default(),
            encoding: TextEncoding::default(),
        }
    }
}

/// Forecast run defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    #[serde(default)]
    pub granularity: Granularity,

    #[serde(default)]
    pub calendar: FutureCalendar,
}

fn default_horizon_days() -> u32 {
    30
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            granularity: Granularity::default(),
            calendar: FutureCalendar::default(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub model: AdditiveConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("timestamp_column", &self.input.timestamp_column),
            ("code_column", &self.input.code_column),
            ("name_column", &self.input.name_column),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }

        validate_horizon(self.forecast.horizon_days)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.forecast.granularity == Granularity::SubDaily
            && !self.input.timestamp_format.has_time_of_day()
        {
            return Err(ConfigError::ValidationError(
                "sub-daily granularity requires a localized timestamp format".to_string(),
            ));
        }

        self.model
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
