//! Normalization of free-text visit timestamps.
//!
//! Visit exports mix plain ISO dates with locale-formatted strings such as
//! `2023-06-01 오후 02:30:00`, where the meridiem marker precedes a 12-hour
//! clock time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default morning marker used by Korean clinic exports.
pub const DEFAULT_MORNING_MARKER: &str = "오전";
/// Default afternoon marker used by Korean clinic exports.
pub const DEFAULT_AFTERNOON_MARKER: &str = "오후";

const DATE_PREFIX_CHARS: usize = 10;
const LOCALIZED_PATTERN: &str = "%Y-%m-%d %p %I:%M:%S";

/// How raw timestamp strings are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum TimestampFormat {
    /// First ten characters as `YYYY-MM-DD`; time of day is midnight.
    #[default]
    DateOnly,
    /// `YYYY-MM-DD {marker} HH:MM:SS` with locale-specific meridiem markers.
    Localized { morning: String, afternoon: String },
}

impl TimestampFormat {
    /// Localized format with the Korean 오전/오후 markers.
    pub fn korean() -> Self {
        TimestampFormat::Localized {
            morning: DEFAULT_MORNING_MARKER.to_string(),
            afternoon: DEFAULT_AFTERNOON_MARKER.to_string(),
        }
    }

    /// This format when it already reads a time of day, otherwise the Korean
    /// localized format.
    pub fn localized(self) -> Self {
        if self.has_time_of_day() {
            self
        } else {
            Self::korean()
        }
    }

    /// Whether parsed timestamps carry a meaningful time of day.
    pub fn has_time_of_day(&self) -> bool {
        matches!(self, TimestampFormat::Localized { .. })
    }

    /// Parse one raw value, returning `None` when it cannot be read.
    pub fn normalize(&self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            TimestampFormat::DateOnly => {
                parse_date_prefix(raw).map(|d| d.and_time(NaiveTime::MIN))
            }
            TimestampFormat::Localized { morning, afternoon } => {
                parse_localized(raw, morning, afternoon)
            }
        }
    }
}

fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim_start();
    let end = raw
        .char_indices()
        .nth(DATE_PREFIX_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(raw.len());
    NaiveDate::parse_from_str(&raw[..end], "%Y-%m-%d").ok()
}

fn parse_localized(raw: &str, morning: &str, afternoon: &str) -> Option<NaiveDateTime> {
    let mut value = raw.trim().to_string();
    if !morning.is_empty() {
        value = value.replace(morning, "AM");
    }
    if !afternoon.is_empty() {
        value = value.replace(afternoon, "PM");
    }
    NaiveDateTime::parse_from_str(&value, LOCALIZED_PATTERN).ok()
}

/// Counts of parsed and skipped timestamps for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub parsed: usize,
    pub skipped: usize,
}

impl NormalizeStats {
    /// Record the outcome of one normalization attempt.
    pub fn record(&mut self, outcome: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        match outcome {
            Some(_) => self.parsed += 1,
            None => self.skipped += 1,
        }
        outcome
    }

    pub fn total(&self) -> usize {
        self.parsed + self.skipped
    }
}
