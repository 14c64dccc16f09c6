//! Aggregation of raw visit rows into clean demand series.
//!
//! Buckets with a non-positive total are treated as "no observation" and
//! dropped rather than kept as zeros, so gaps stay gaps all the way into the
//! model fit.

use super::window::TrainingWindow;
use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::ingest::{NormalizeStats, RecordSet, TimestampFormat};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

/// Diagnostics collected while building a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Rows in the record set.
    pub rows: usize,
    /// Timestamp parse outcomes.
    pub timestamps: NormalizeStats,
    /// Positive buckets before windowing.
    pub observed: usize,
    /// Positive buckets inside the training window.
    pub in_window: usize,
}

/// Daily totals for one drug code.
///
/// Dates are strictly increasing and every quantity is strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    code: String,
    points: Vec<(NaiveDate, f64)>,
}

impl DailySeries {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    /// Total quantity over all observed days.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, q)| q).sum()
    }

    /// Model input with one midnight timestamp per observed day.
    pub fn to_time_series(&self) -> Result<TimeSeries> {
        let (timestamps, values): (Vec<_>, Vec<_>) = self
            .points
            .iter()
            .map(|(d, q)| (d.and_time(NaiveTime::MIN), *q))
            .unzip();
        TimeSeries::new(timestamps, values)
    }
}

/// Hourly totals for one drug code, used for sub-daily fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    code: String,
    points: Vec<(NaiveDateTime, f64)>,
}

impl HourlySeries {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> &[(NaiveDateTime, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_time_series(&self) -> Result<TimeSeries> {
        let (timestamps, values): (Vec<_>, Vec<_>) = self.points.iter().copied().unzip();
        TimeSeries::new(timestamps, values)
    }
}

/// Coerce a raw quantity cell into a non-negative number.
///
/// Missing, non-numeric, non-finite and negative values become zero.
pub fn coerce_quantity(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

/// Builds demand series for a drug code from a record set.
#[derive(Debug, Clone)]
pub struct SeriesBuilder<'a> {
    records: &'a RecordSet,
    format: TimestampFormat,
}

impl<'a> SeriesBuilder<'a> {
    pub fn new(records: &'a RecordSet, format: TimestampFormat) -> Self {
        Self { records, format }
    }

    /// Daily totals, optionally intersected with a training window.
    pub fn build(
        &self,
        code: &str,
        window: Option<&TrainingWindow>,
    ) -> Result<(DailySeries, BuildReport)> {
        let code = code.trim();
        let (buckets, mut report) = self.aggregate(code, |ts| ts.date())?;
        let points = Self::restrict(code, buckets, window, |d| *d, &mut report)?;
        Ok((
            DailySeries {
                code: code.to_string(),
                points,
            },
            report,
        ))
    }

    /// Hourly totals, optionally intersected with a training window.
    pub fn build_hourly(
        &self,
        code: &str,
        window: Option<&TrainingWindow>,
    ) -> Result<(HourlySeries, BuildReport)> {
        if !self.format.has_time_of_day() {
            return Err(ForecastError::InvalidParameter(
                "hourly series require a timestamp format with time of day".into(),
            ));
        }
        let code = code.trim();
        let (buckets, mut report) = self.aggregate(code, |ts| {
            ts.date()
                .and_hms_opt(ts.hour(), 0, 0)
                .unwrap_or(ts)
        })?;
        let points = Self::restrict(code, buckets, window, |ts| ts.date(), &mut report)?;
        Ok((
            HourlySeries {
                code: code.to_string(),
                points,
            },
            report,
        ))
    }

    fn aggregate<K, F>(&self, code: &str, bucket: F) -> Result<(BTreeMap<K, f64>, BuildReport)>
    where
        K: Ord,
        F: Fn(NaiveDateTime) -> K,
    {
        if !self.records.has_column(code) {
            return Err(ForecastError::InputShape(code.to_string()));
        }

        let mut report = BuildReport {
            rows: self.records.len(),
            ..BuildReport::default()
        };
        let mut buckets: BTreeMap<K, f64> = BTreeMap::new();

        for record in self.records.records() {
            let Some(ts) = report
                .timestamps
                .record(self.format.normalize(record.timestamp()))
            else {
                continue;
            };
            *buckets.entry(bucket(ts)).or_insert(0.0) += coerce_quantity(record.quantity(code));
        }

        if report.timestamps.skipped > 0 {
            tracing::warn!(
                code,
                skipped = report.timestamps.skipped,
                rows = report.rows,
                "dropped rows with unparseable timestamps"
            );
        }

        buckets.retain(|_, total| *total > 0.0);
        report.observed = buckets.len();
        if buckets.is_empty() {
            return Err(ForecastError::NoData {
                code: code.to_string(),
            });
        }

        Ok((buckets, report))
    }

    fn restrict<K, D>(
        code: &str,
        buckets: BTreeMap<K, f64>,
        window: Option<&TrainingWindow>,
        date_of: D,
        report: &mut BuildReport,
    ) -> Result<Vec<(K, f64)>>
    where
        D: Fn(&K) -> NaiveDate,
    {
        let points: Vec<(K, f64)> = match window {
            Some(w) => buckets
                .into_iter()
                .filter(|(k, _)| w.contains(date_of(k)))
                .collect(),
            None => buckets.into_iter().collect(),
        };
        report.in_window = points.len();

        if let (Some(w), true) = (window, points.is_empty()) {
            return Err(ForecastError::NoDataInWindow {
                code: code.to_string(),
                start: w.start(),
                end: w.end(),
            });
        }

        tracing::debug!(
            code,
            observed = report.observed,
            in_window = report.in_window,
            "built demand series"
        );
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::VisitRecord;

    const CODE: &str = "645902470";

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn records(rows: &[(&str, &str)]) -> RecordSet {
        RecordSet::new(
            vec![CODE.to_string(), "OTHER".to_string()],
            rows.iter()
                .map(|(ts, q)| VisitRecord::new(*ts).with_quantity(CODE, *q))
                .collect(),
        )
    }

    #[test]
    fn same_day_rows_sum_with_non_numeric_as_zero() {
        let set = records(&[
            ("2023-06-01 오전 09:00:00", "3"),
            ("2023-06-01 오전 10:00:00", "abc"),
            ("2023-06-01 오후 04:00:00", "5"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let (series, report) = builder.build(CODE, None).unwrap();

        assert_eq!(series.points(), &[(date(6, 1), 8.0)]);
        assert_eq!(report.rows, 3);
        assert_eq!(report.timestamps.parsed, 3);
        assert_eq!(report.observed, 1);
    }

    #[test]
    fn zero_days_are_dropped_not_filled() {
        let set = records(&[
            ("2023-06-01", "2"),
            ("2023-06-02", "0"),
            ("2023-06-03", ""),
            ("2023-06-05", "4"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let (series, _) = builder.build(CODE, None).unwrap();

        assert_eq!(series.points(), &[(date(6, 1), 2.0), (date(6, 5), 4.0)]);
        assert_eq!(series.total(), 6.0);
    }

    #[test]
    fn output_is_sorted_regardless_of_input_order() {
        let set = records(&[
            ("2023-06-09", "1"),
            ("2023-06-01", "2"),
            ("2023-06-04", "3"),
            ("2023-06-01", "1"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let (series, _) = builder.build(CODE, None).unwrap();

        let dates: Vec<_> = series.points().iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![date(6, 1), date(6, 4), date(6, 9)]);
        assert_eq!(series.first_date(), Some(date(6, 1)));
        assert_eq!(series.last_date(), Some(date(6, 9)));
    }

    #[test]
    fn unknown_code_is_an_input_shape_error() {
        let set = records(&[("2023-06-01", "2")]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        assert_eq!(
            builder.build("999", None),
            Err(ForecastError::InputShape("999".to_string()))
        );
    }

    #[test]
    fn all_zero_column_is_no_data() {
        let set = records(&[("2023-06-01", "0"), ("2023-06-02", "x"), ("2023-06-03", "-4")]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        assert_eq!(
            builder.build(CODE, None),
            Err(ForecastError::NoData {
                code: CODE.to_string()
            })
        );
    }

    #[test]
    fn empty_window_intersection_is_distinct_error() {
        let set = records(&[("2023-06-01", "2"), ("2023-06-10", "3")]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let window = TrainingWindow::new(date(6, 2), date(6, 9)).unwrap();

        assert_eq!(
            builder.build(CODE, Some(&window)),
            Err(ForecastError::NoDataInWindow {
                code: CODE.to_string(),
                start: date(6, 2),
                end: date(6, 9),
            })
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let set = records(&[
            ("2023-06-01", "1"),
            ("2023-06-02", "2"),
            ("2023-06-03", "3"),
            ("2023-06-04", "4"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let window = TrainingWindow::new(date(6, 2), date(6, 3)).unwrap();
        let (series, report) = builder.build(CODE, Some(&window)).unwrap();

        assert_eq!(series.points(), &[(date(6, 2), 2.0), (date(6, 3), 3.0)]);
        assert_eq!(report.observed, 4);
        assert_eq!(report.in_window, 2);
    }

    #[test]
    fn unparseable_rows_are_counted_and_skipped() {
        let set = records(&[
            ("2023-06-01 오전 09:00:00", "2"),
            ("yesterday", "50"),
            ("2023-06-01 오후 01:00:00", "1"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::korean());
        let (series, report) = builder.build(CODE, None).unwrap();

        assert_eq!(series.points(), &[(date(6, 1), 3.0)]);
        assert_eq!(report.timestamps.skipped, 1);
        assert_eq!(report.timestamps.parsed, 2);
    }

    #[test]
    fn hourly_series_buckets_by_hour() {
        let set = records(&[
            ("2023-06-01 오전 09:05:00", "2"),
            ("2023-06-01 오전 09:55:00", "1"),
            ("2023-06-01 오후 02:30:00", "4"),
            ("2023-06-01 오후 03:00:00", "0"),
        ]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::korean());
        let (series, _) = builder.build_hourly(CODE, None).unwrap();

        let nine = date(6, 1).and_hms_opt(9, 0, 0).unwrap();
        let two_pm = date(6, 1).and_hms_opt(14, 0, 0).unwrap();
        assert_eq!(series.points(), &[(nine, 3.0), (two_pm, 4.0)]);
    }

    #[test]
    fn hourly_series_require_time_of_day() {
        let set = records(&[("2023-06-01", "2")]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        assert!(matches!(
            builder.build_hourly(CODE, None),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn coerce_quantity_rules() {
        assert_eq!(coerce_quantity(Some(" 2.5 ")), 2.5);
        assert_eq!(coerce_quantity(Some("abc")), 0.0);
        assert_eq!(coerce_quantity(Some("-3")), 0.0);
        assert_eq!(coerce_quantity(Some("NaN")), 0.0);
        assert_eq!(coerce_quantity(None), 0.0);
    }

    #[test]
    fn daily_series_converts_to_midnight_time_series() {
        let set = records(&[("2023-06-01", "2"), ("2023-06-03", "5")]);
        let builder = SeriesBuilder::new(&set, TimestampFormat::DateOnly);
        let (series, _) = builder.build(CODE, None).unwrap();
        let ts = series.to_time_series().unwrap();

        assert_eq!(ts.len(), 2);
        assert_eq!(ts.values(), &[2.0, 5.0]);
        assert_eq!(ts.timestamps()[1], date(6, 3).and_time(NaiveTime::MIN));
    }
}
