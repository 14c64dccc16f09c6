use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rx_forecast::config::AppConfig;
use rx_forecast::depletion::DepletionEstimate;
use rx_forecast::ingest::{DrugDirectory, RecordSet, TextEncoding};
use rx_forecast::models::{FutureCalendar, Granularity};
use rx_forecast::pipeline::{run, RunConfig, RunOutcome};
use rx_forecast::series::{SeriesBuilder, TrainingWindow};
use rx_forecast::ForecastError;

#[derive(Parser)]
#[command(name = "rx-forecast")]
#[command(about = "Prescription volume forecasting and stock depletion estimates")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./rx-forecast.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a drug's history and forecast future volumes
    Forecast {
        /// Visit record CSV
        #[arg(long)]
        records: PathBuf,

        /// Drug code lookup table (CSV or Excel workbook)
        #[arg(long)]
        directory: PathBuf,

        /// Drug code (visit table column)
        #[arg(long)]
        code: String,

        /// First training date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last training date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Forecast horizon in days
        #[arg(long)]
        horizon: Option<u32>,

        /// Starting stock for the depletion estimate
        #[arg(long)]
        stock: Option<u64>,

        #[arg(long, value_enum)]
        granularity: Option<Granularity>,

        #[arg(long, value_enum)]
        calendar: Option<FutureCalendar>,

        /// Timestamps carry 오전/오후 markers and a time of day
        #[arg(long)]
        localized: bool,

        /// Encoding of the CSV inputs
        #[arg(long, value_enum)]
        encoding: Option<TextEncoding>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the daily forecast to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Print the cleaned daily series without fitting
    Series {
        /// Visit record CSV
        #[arg(long)]
        records: PathBuf,

        /// Drug code (visit table column)
        #[arg(long)]
        code: String,

        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Timestamps carry 오전/오후 markers and a time of day
        #[arg(long)]
        localized: bool,

        /// Encoding of the CSV input
        #[arg(long, value_enum)]
        encoding: Option<TextEncoding>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Starting rx-forecast v{}", env!("CARGO_PKG_VERSION"));

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Input problems are shown verbatim; model failures only generically.
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<ForecastError>() {
        Some(e) if e.is_precondition() || matches!(e, ForecastError::Table(_)) => {
            eprintln!("error: {:#}", err)
        }
        Some(e) => {
            tracing::error!(error = %e, "forecast failed");
            eprintln!("error: the forecast could not be computed for this data");
        }
        None => eprintln!("error: {:#}", err),
    }
}

fn execute(cli: Cli) -> Result<()> {
    let mut app = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    match cli.command {
        Commands::Forecast {
            records,
            directory,
            code,
            start,
            end,
            horizon,
            stock,
            granularity,
            calendar,
            localized,
            encoding,
            json,
            export,
        } => {
            if let Some(encoding) = encoding {
                app.input.encoding = encoding;
            }
            // Window errors surface before any file is read.
            let window = TrainingWindow::new(start, end)?;

            let mut config = RunConfig::from_app_config(&app, code).with_window(window);
            if let Some(horizon) = horizon {
                config = config.with_horizon(horizon);
            }
            if let Some(stock) = stock {
                config = config.with_stock(stock);
            }
            if let Some(granularity) = granularity {
                config = config.with_granularity(granularity);
            }
            if let Some(calendar) = calendar {
                config = config.with_calendar(calendar);
            }
            if localized {
                let format = config.timestamp_format.clone().localized();
                config = config.with_timestamp_format(format);
            }
            config.validate()?;

            let records = read_records(&records, &app)?;
            let directory = DrugDirectory::from_path(
                &directory,
                &app.input.code_column,
                &app.input.name_column,
                app.input.encoding,
            )
            .with_context(|| format!("reading drug directory {}", directory.display()))?;

            let outcome = run(&records, &directory, &config)?;

            if let Some(path) = export {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                outcome.forecast.daily().write_csv(file)?;
                tracing::info!(path = %path.display(), "forecast exported");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
            } else {
                print_outcome(&outcome);
            }
        }

        Commands::Series {
            records,
            code,
            start,
            end,
            localized,
            encoding,
            json,
        } => {
            if let Some(encoding) = encoding {
                app.input.encoding = encoding;
            }
            let window = match (start, end) {
                (Some(start), Some(end)) => Some(TrainingWindow::new(start, end)?),
                _ => None,
            };
            let format = if localized {
                app.input.timestamp_format.clone().localized()
            } else {
                app.input.timestamp_format.clone()
            };

            let records = read_records(&records, &app)?;
            let (series, report) =
                SeriesBuilder::new(&records, format).build(&code, window.as_ref())?;

            if json {
                let points: Vec<_> = series
                    .points()
                    .iter()
                    .map(|(date, quantity)| json!({ "date": date, "quantity": quantity }))
                    .collect();
                let value = json!({
                    "code": series.code(),
                    "report": report,
                    "series": points,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("\n=== Series {} ===", series.code());
                println!("Rows read:        {}", report.rows);
                println!("Rows skipped:     {}", report.timestamps.skipped);
                println!("Observed days:    {}", report.observed);
                println!("Days in window:   {}", report.in_window);
                println!("Total quantity:   {}", series.total());
                println!();
                for (date, quantity) in series.points() {
                    println!("{}  {}", date, quantity);
                }
            }
        }
    }

    Ok(())
}

fn read_records(path: &Path, app: &AppConfig) -> Result<RecordSet> {
    RecordSet::from_path(path, &app.input.timestamp_column, app.input.encoding)
        .with_context(|| format!("reading visit records {}", path.display()))
}

fn outcome_json(outcome: &RunOutcome) -> serde_json::Value {
    let future: Vec<_> = outcome
        .forecast
        .daily()
        .after(outcome.frame.end())
        .collect();
    json!({
        "code": outcome.drug_code,
        "name": outcome.drug_name,
        "window": outcome.frame,
        "report": outcome.report,
        "observed_days": outcome.series.len(),
        "forecast": future,
        "components": outcome.components,
        "depletion": outcome.depletion,
    })
}

fn print_outcome(outcome: &RunOutcome) {
    println!("\n=== {} ({}) ===", outcome.drug_name, outcome.drug_code);
    println!(
        "Training window:  {} .. {}",
        outcome.frame.start(),
        outcome.frame.end()
    );
    println!("Observed days:    {}", outcome.series.len());
    println!("Rows skipped:     {}", outcome.report.timestamps.skipped);

    println!("\nForecast (daily):");
    for row in outcome.forecast.daily().after(outcome.frame.end()) {
        println!(
            "  {}  {:>8.1}  [{:.1}, {:.1}]",
            row.ds.date(),
            row.yhat,
            row.yhat_lower,
            row.yhat_upper
        );
    }

    println!("\nWeekly effect:");
    for effect in &outcome.components.weekly {
        println!("  {}  {:+.2}", effect.weekday, effect.effect);
    }

    if let Some(intraday) = &outcome.components.intraday {
        println!("\nTime-of-day effect:");
        for point in intraday.iter().filter(|p| p.time.minute() == 0) {
            println!("  {}  {:+.2}", point.time.format("%H:%M"), point.effect);
        }
    }

    match &outcome.depletion {
        Some(DepletionEstimate::Depleted {
            stock,
            date,
            days_elapsed,
            ..
        }) => println!(
            "\nStock of {} runs out on {} ({} days after {})",
            stock,
            date,
            days_elapsed,
            outcome.frame.end()
        ),
        Some(DepletionEstimate::NotDepletedWithinHorizon {
            stock,
            horizon_days,
            cumulative_total,
        }) => println!(
            "\nStock of {} lasts beyond the {} day horizon ({:.1} used)",
            stock, horizon_days, cumulative_total
        ),
        None => {}
    }
}
