//! End-to-end tests: CSV tables on disk through to forecast and depletion.

use std::fmt::Write as _;
use std::io::Write;

use approx::assert_relative_eq;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rx_forecast::depletion::DepletionEstimate;
use rx_forecast::prelude::*;
use tempfile::NamedTempFile;

const CODE: &str = "645902470";
const OTHER: &str = "A100";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Visit table for 2024-01-01..2024-03-31 with Sunday closures.
///
/// Weekdays see two visits of 4 units (8 per day); Saturdays one visit of 3.
/// One unparseable timestamp and one non-numeric cell are mixed in.
fn visit_csv() -> String {
    let mut csv = format!("진료일시,{},{}\n", CODE, OTHER);
    let start = date(2024, 1, 1);
    for i in 0..91 {
        let day = start + Duration::days(i);
        match day.weekday() {
            Weekday::Sun => {}
            Weekday::Sat => {
                writeln!(csv, "{} 오전 10:00:00,3,", day).unwrap();
            }
            _ => {
                writeln!(csv, "{} 오전 09:30:00,4,1", day).unwrap();
                writeln!(csv, "{} 오후 03:15:00,4,", day).unwrap();
                writeln!(csv, "{} 오후 04:00:00,abc,", day).unwrap();
            }
        }
    }
    csv.push_str("unknown,9,9\n");
    csv
}

fn directory_csv() -> &'static str {
    "연합회코드,연합회전용명\n 645902470 , Amoxicillin 500mg \nA100,Ibuprofen\n"
}

fn load() -> (RecordSet, DrugDirectory) {
    let visits = write_temp(&visit_csv());
    let lookup = write_temp(directory_csv());
    let records = RecordSet::from_path(visits.path(), "진료일시", TextEncoding::Auto).unwrap();
    let directory =
        DrugDirectory::from_path(lookup.path(), "연합회코드", "연합회전용명", TextEncoding::Auto)
            .unwrap();
    (records, directory)
}

fn window() -> TrainingWindow {
    TrainingWindow::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap()
}

#[test]
fn daily_run_produces_forecast_components_and_depletion() {
    let (records, directory) = load();
    let config = RunConfig::new(CODE)
        .with_window(window())
        .with_horizon(30)
        .with_stock(100);

    let outcome = run(&records, &directory, &config).unwrap();

    assert_eq!(outcome.drug_name, "Amoxicillin 500mg");
    assert_eq!(outcome.report.timestamps.skipped, 1);
    // Every non-Sunday day between Jan 1 and Mar 31.
    assert_eq!(outcome.series.len(), 78);
    assert!(outcome
        .series
        .points()
        .iter()
        .all(|(d, _)| d.weekday() != Weekday::Sun));

    let daily = outcome.forecast.daily();
    assert_eq!(daily.len(), 91 + 30);
    let future: Vec<_> = daily.after(date(2024, 3, 31)).collect();
    assert_eq!(future.len(), 30);
    let weekday_mean = future
        .iter()
        .filter(|row| !matches!(row.ds.weekday(), Weekday::Sat | Weekday::Sun))
        .map(|row| row.yhat)
        .sum::<f64>()
        / future
            .iter()
            .filter(|row| !matches!(row.ds.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as f64;
    assert!((weekday_mean - 8.0).abs() < 1.5, "weekday mean {}", weekday_mean);

    let weekly = &outcome.components.weekly;
    assert_eq!(weekly.len(), 6);
    assert_eq!(weekly[0].weekday, Weekday::Mon);
    assert_eq!(weekly[5].weekday, Weekday::Sat);
    assert!(weekly[5].effect < weekly[2].effect);
    assert!(outcome.components.intraday.is_none());

    match outcome.depletion {
        Some(DepletionEstimate::Depleted {
            date: depleted_on,
            days_elapsed,
            cumulative,
            ..
        }) => {
            assert!(cumulative >= 100.0);
            assert_eq!((depleted_on - date(2024, 3, 31)).num_days(), days_elapsed);
            assert!(days_elapsed > 5 && days_elapsed < 30);
        }
        other => panic!("expected depletion, got {:?}", other),
    }
}

#[test]
fn large_stock_is_not_depleted_within_horizon() {
    let (records, directory) = load();
    let config = RunConfig::new(CODE)
        .with_window(window())
        .with_horizon(14)
        .with_stock(1_000_000);

    let outcome = run(&records, &directory, &config).unwrap();
    match outcome.depletion {
        Some(DepletionEstimate::NotDepletedWithinHorizon {
            horizon_days,
            cumulative_total,
            ..
        }) => {
            assert_eq!(horizon_days, 14);
            assert!(cumulative_total > 0.0);
        }
        other => panic!("expected no depletion, got {:?}", other),
    }
}

#[test]
fn sub_daily_run_reports_intraday_profile() {
    let (records, directory) = load();
    let config = RunConfig::new(CODE)
        .with_window(window())
        .with_horizon(7)
        .with_granularity(Granularity::SubDaily)
        .with_timestamp_format(TimestampFormat::korean());

    let outcome = run(&records, &directory, &config).unwrap();

    let intraday = outcome.components.intraday.as_ref().unwrap();
    assert!(!intraday.is_empty());
    assert!(intraday.iter().all(|p| {
        let hour = chrono::Timelike::hour(&p.time);
        (8..=19).contains(&hour)
    }));

    let daily = outcome.forecast.daily();
    assert!(daily.point().iter().all(|&v| v >= 0.0));
    assert_eq!(daily.after(date(2024, 3, 31)).count(), 7);
}

#[test]
fn inverted_window_is_rejected_before_parsing() {
    assert_eq!(
        TrainingWindow::new(date(2024, 3, 1), date(2024, 2, 1)),
        Err(ForecastError::InvalidWindow {
            start: date(2024, 3, 1),
            end: date(2024, 2, 1),
        })
    );
}

#[test]
fn missing_code_column_is_input_shape() {
    let (records, directory) = load();
    let config = RunConfig::new("999999999").with_window(window());
    let err = run(&records, &directory, &config).unwrap_err();
    assert_eq!(err, ForecastError::InputShape("999999999".into()));
    assert!(err.is_precondition());
}

#[test]
fn code_without_positive_values_is_no_data() {
    let csv = "진료일시,Z1\n2024-01-01,0\n2024-01-02,abc\n2024-01-03,-2\n";
    let records = RecordSet::from_reader(csv.as_bytes(), "진료일시").unwrap();
    let config = RunConfig::new("Z1");
    assert_eq!(
        run(&records, &DrugDirectory::new(), &config).unwrap_err(),
        ForecastError::NoData { code: "Z1".into() }
    );
}

#[test]
fn mixed_cells_on_one_date_sum_to_one_entry() {
    let csv = "진료일시,Z1\n2024-01-01,3\n2024-01-01,abc\n2024-01-01,5\n";
    let records = RecordSet::from_reader(csv.as_bytes(), "진료일시").unwrap();
    let (series, report) = SeriesBuilder::new(&records, TimestampFormat::DateOnly)
        .build("Z1", None)
        .unwrap();
    assert_eq!(series.points(), &[(date(2024, 1, 1), 8.0)]);
    assert_eq!(report.rows, 3);
}

#[test]
fn repeated_runs_are_identical() {
    let (records, directory) = load();
    let config = RunConfig::new(CODE)
        .with_window(window())
        .with_horizon(21)
        .with_stock(60);

    let first = run(&records, &directory, &config).unwrap();
    let second = run(&records, &directory, &config).unwrap();

    assert_eq!(first.series, second.series);
    assert_eq!(first.forecast, second.forecast);
    assert_eq!(first.depletion, second.depletion);
}

#[test]
fn business_day_calendar_skips_weekends_in_horizon() {
    let (records, directory) = load();
    let config = RunConfig::new(OTHER)
        .with_window(window())
        .with_horizon(14)
        .with_calendar(FutureCalendar::BusinessDays);

    let outcome = run(&records, &directory, &config).unwrap();
    assert_eq!(outcome.drug_name, "Ibuprofen");
    let future: Vec<_> = outcome.forecast.future().collect();
    assert_eq!(future.len(), 10);
    for row in &future {
        assert_relative_eq!(row.yhat, 1.0, epsilon = 0.5);
    }
}

#[test]
fn forecast_export_round_trips_through_csv() {
    let (records, directory) = load();
    let config = RunConfig::new(CODE).with_window(window()).with_horizon(5);
    let outcome = run(&records, &directory, &config).unwrap();

    let file = NamedTempFile::new().unwrap();
    outcome
        .forecast
        .daily()
        .write_csv(std::fs::File::create(file.path()).unwrap())
        .unwrap();

    let mut reader = csv::Reader::from_path(file.path()).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(headers, vec!["ds", "yhat", "yhat_lower", "yhat_upper"]);
    assert_eq!(reader.records().count(), 91 + 5);
}

#[test]
fn cp949_exports_run_end_to_end() {
    let visit_text = visit_csv();
    let (visits, _, _) = encoding_rs::EUC_KR.encode(&visit_text);
    let (lookup, _, _) = encoding_rs::EUC_KR.encode("연합회코드,연합회전용명\n645902470,아모크라정\n");
    let visits_file = write_temp_bytes(&visits);
    let lookup_file = write_temp_bytes(&lookup);

    let records =
        RecordSet::from_path(visits_file.path(), "진료일시", TextEncoding::Cp949).unwrap();
    let directory = DrugDirectory::from_path(
        lookup_file.path(),
        "연합회코드",
        "연합회전용명",
        TextEncoding::Auto,
    )
    .unwrap();

    let config = RunConfig::new(CODE).with_window(window()).with_horizon(7);
    let outcome = run(&records, &directory, &config).unwrap();
    assert_eq!(outcome.drug_name, "아모크라정");
    assert_eq!(outcome.series.len(), 78);
}

fn write_temp_bytes(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

/// 10 units at 09:00 every day and 10 at 18:00 on the 1st, 31st and 61st day.
fn occasional_evening_csv() -> String {
    let mut csv = format!("진료일시,{}\n", CODE);
    let start = date(2024, 1, 1);
    for i in 0..90 {
        let day = start + Duration::days(i);
        writeln!(csv, "{} 오전 09:00:00,10", day).unwrap();
        if i % 30 == 0 {
            writeln!(csv, "{} 오후 06:00:00,10", day).unwrap();
        }
    }
    csv
}

#[test]
fn sub_daily_depletion_agrees_with_daily_when_an_hour_is_rare() {
    let records =
        RecordSet::from_reader(occasional_evening_csv().as_bytes(), "진료일시").unwrap();
    let window = TrainingWindow::new(date(2024, 1, 1), date(2024, 3, 30)).unwrap();
    let base = RunConfig::new(CODE)
        .with_window(window)
        .with_horizon(60)
        .with_stock(300)
        .with_timestamp_format(TimestampFormat::korean());

    let daily = run(&records, &DrugDirectory::new(), &base).unwrap();
    let sub_daily = run(
        &records,
        &DrugDirectory::new(),
        &base.clone().with_granularity(Granularity::SubDaily),
    )
    .unwrap();

    let future_mean = |outcome: &RunOutcome| {
        let rows: Vec<f64> = outcome
            .forecast
            .daily()
            .after(date(2024, 3, 30))
            .map(|row| row.yhat)
            .collect();
        rows.iter().sum::<f64>() / rows.len() as f64
    };
    assert_relative_eq!(future_mean(&sub_daily), 10.0 + 10.0 / 30.0, epsilon = 0.5);
    assert_relative_eq!(future_mean(&sub_daily), future_mean(&daily), epsilon = 1.0);

    let elapsed = |outcome: &RunOutcome| match outcome.depletion {
        Some(DepletionEstimate::Depleted { days_elapsed, .. }) => days_elapsed,
        ref other => panic!("expected depletion, got {:?}", other),
    };
    assert!((elapsed(&sub_daily) - elapsed(&daily)).abs() <= 3);
    assert!(elapsed(&sub_daily) >= 27);
}
