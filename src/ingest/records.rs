//! Visit records: one row per clinic visit, one column per drug code.

use super::encoding::TextEncoding;
use crate::error::{ForecastError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Default timestamp column of clinic visit exports.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "진료일시";

/// One raw visit row.
///
/// Quantities are kept as the raw cell text and coerced only when a drug
/// code is selected. Empty cells are not stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitRecord {
    timestamp: String,
    quantities: HashMap<String, String>,
}

impl VisitRecord {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            quantities: HashMap::new(),
        }
    }

    /// Add a raw quantity cell for a drug code.
    pub fn with_quantity(mut self, code: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if !raw.trim().is_empty() {
            self.quantities.insert(code.into(), raw);
        }
        self
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Raw cell for a drug code, `None` when empty or absent.
    pub fn quantity(&self, code: &str) -> Option<&str> {
        self.quantities.get(code).map(|v| v.as_str())
    }
}

/// A visit table: the header's drug-code columns plus the parsed rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<VisitRecord>,
}

impl RecordSet {
    /// Create a record set from known quantity columns and rows.
    pub fn new(columns: Vec<String>, records: Vec<VisitRecord>) -> Self {
        Self { columns, records }
    }

    /// Read a CSV visit table with a header row.
    ///
    /// Header names are trimmed. Every column other than `timestamp_column`
    /// is treated as a drug-code quantity column.
    pub fn from_reader<R: Read>(reader: R, timestamp_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let ts_index = headers
            .iter()
            .position(|h| h == timestamp_column)
            .ok_or_else(|| ForecastError::InputShape(timestamp_column.to_string()))?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = VisitRecord::new(row.get(ts_index).unwrap_or_default());
            for (idx, cell) in row.iter().enumerate() {
                if idx == ts_index {
                    continue;
                }
                if let Some(code) = headers.get(idx) {
                    record = record.with_quantity(code.as_str(), cell);
                }
            }
            records.push(record);
        }

        let columns = headers
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| *idx != ts_index)
            .map(|(_, h)| h)
            .collect();

        tracing::debug!(rows = records.len(), "read visit records");
        Ok(Self { columns, records })
    }

    /// Read a CSV visit table from raw bytes in the given encoding.
    pub fn from_bytes(
        bytes: &[u8],
        timestamp_column: &str,
        encoding: TextEncoding,
    ) -> Result<Self> {
        let text = encoding.decode(bytes)?;
        Self::from_reader(text.as_bytes(), timestamp_column)
    }

    /// Read a CSV visit table from disk.
    pub fn from_path(
        path: impl AsRef<Path>,
        timestamp_column: &str,
        encoding: TextEncoding,
    ) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes, timestamp_column, encoding)
    }

    /// Quantity column names in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, code: &str) -> bool {
        self.columns.iter().any(|c| c == code)
    }

    pub fn records(&self) -> &[VisitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
