//! End-to-end forecast run for one drug code.
//!
//! A run is a pure function of the record set, the directory and the
//! [`RunConfig`]: nothing is cached or shared between runs.

use crate::config::AppConfig;
use crate::depletion::{self, DepletionEstimate};
use crate::error::{ForecastError, Result};
use crate::ingest::{DrugDirectory, RecordSet, TimestampFormat};
use crate::models::{
    profile_grid, validate_horizon, AdditiveConfig, ForecastAdapter, ForecastResult,
    FutureCalendar, Granularity,
};
use crate::seasonality::{summarize, ComponentSummary};
use crate::series::{BuildReport, DailySeries, SeriesBuilder, TrainingWindow};

/// Parameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub drug_code: String,
    /// Training data selection; the whole observed range when absent.
    pub training_window: Option<TrainingWindow>,
    pub horizon_days: u32,
    pub starting_stock: Option<u64>,
    pub granularity: Granularity,
    pub timestamp_format: TimestampFormat,
    pub future_calendar: FutureCalendar,
    pub model: AdditiveConfig,
}

impl RunConfig {
    /// A daily, all-days run with a 30 day horizon.
    pub fn new(drug_code: impl Into<String>) -> Self {
        Self::from_app_config(&AppConfig::default(), drug_code)
    }

    /// Run defaults taken from the application configuration.
    pub fn from_app_config(app: &AppConfig, drug_code: impl Into<String>) -> Self {
        Self {
            drug_code: drug_code.into(),
            training_window: None,
            horizon_days: app.forecast.horizon_days,
            starting_stock: None,
            granularity: app.forecast.granularity,
            timestamp_format: app.input.timestamp_format.clone(),
            future_calendar: app.forecast.calendar,
            model: app.model.clone(),
        }
    }

    pub fn with_window(mut self, window: TrainingWindow) -> Self {
        self.training_window = Some(window);
        self
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_stock(mut self, stock: u64) -> Self {
        self.starting_stock = Some(stock);
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn with_calendar(mut self, calendar: FutureCalendar) -> Self {
        self.future_calendar = calendar;
        self
    }

    /// Check run parameters before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if self.drug_code.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "drug code must not be empty".into(),
            ));
        }
        validate_horizon(self.horizon_days)?;
        if self.granularity == Granularity::SubDaily && !self.timestamp_format.has_time_of_day() {
            return Err(ForecastError::InvalidParameter(
                "sub-daily granularity requires a localized timestamp format".into(),
            ));
        }
        self.model.validate()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub drug_code: String,
    /// Display name, or `[code]` when the directory has no entry.
    pub drug_name: String,
    /// Date range the model was trained and evaluated on.
    pub frame: TrainingWindow,
    pub report: BuildReport,
    /// Daily training totals.
    pub series: DailySeries,
    pub forecast: ForecastResult,
    pub components: ComponentSummary,
    pub depletion: Option<DepletionEstimate>,
}

/// Build the series, fit, predict, summarize and estimate depletion.
pub fn run(records: &RecordSet, directory: &DrugDirectory, config: &RunConfig) -> Result<RunOutcome> {
    config.validate()?;

    let code = config.drug_code.trim();
    let drug_name = directory.display_name(code);
    tracing::info!(code, name = %drug_name, granularity = ?config.granularity, "starting forecast run");

    let builder = SeriesBuilder::new(records, config.timestamp_format.clone());
    let window = config.training_window.as_ref();
    let (series, report) = builder.build(code, window)?;

    let frame = match config.training_window {
        Some(window) => window,
        None => match (series.first_date(), series.last_date()) {
            (Some(start), Some(end)) => TrainingWindow::new(start, end)?,
            _ => {
                return Err(ForecastError::NoData {
                    code: code.to_string(),
                })
            }
        },
    };

    let training = match config.granularity {
        Granularity::Daily => series.to_time_series()?,
        Granularity::SubDaily => builder.build_hourly(code, window)?.0.to_time_series()?,
    }
    .with_label(drug_name.clone());
    tracing::debug!(
        observations = training.len(),
        start = %frame.start(),
        end = %frame.end(),
        "training series ready"
    );

    let mut adapter =
        ForecastAdapter::additive(config.model.clone(), config.granularity, config.future_calendar);
    let forecast = adapter.fit_and_predict(&training, &frame, config.horizon_days)?;

    let decomposition = adapter.decompose(forecast.forecast().timestamps())?;
    let profile = match config.granularity {
        Granularity::Daily => None,
        Granularity::SubDaily => Some(adapter.decompose(&profile_grid(frame.end()))?),
    };
    let components = summarize(&decomposition, profile.as_ref());

    let depletion = config
        .starting_stock
        .map(|stock| depletion::estimate(&forecast.daily(), frame.end(), stock));

    tracing::info!(
        code,
        observed_days = series.len(),
        skipped_rows = report.timestamps.skipped,
        depleted = ?depletion.as_ref().map(DepletionEstimate::is_depleted),
        "forecast run complete"
    );

    Ok(RunOutcome {
        drug_code: code.to_string(),
        drug_name,
        frame,
        report,
        series,
        forecast,
        components,
        depletion,
    })
}
