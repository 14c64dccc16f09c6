//! Drug code to display name lookup.

use super::encoding::TextEncoding;
use crate::error::{ForecastError, Result};
use calamine::Reader as _;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Default code column of the pharmacy association lookup table.
pub const DEFAULT_CODE_COLUMN: &str = "연합회코드";
/// Default name column of the pharmacy association lookup table.
pub const DEFAULT_NAME_COLUMN: &str = "연합회전용명";

/// Mapping from drug code to display name.
///
/// Lookups never fail: an unknown code renders as `[code]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugDirectory {
    names: HashMap<String, String>,
}

impl DrugDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; code and name are trimmed.
    pub fn insert(&mut self, code: &str, name: &str) {
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        self.names.insert(code.to_string(), name.trim().to_string());
    }

    /// Read a CSV lookup table with `code_column` and `name_column` headers.
    pub fn from_reader<R: Read>(reader: R, code_column: &str, name_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(header_name).collect();
        let (code_index, name_index) = lookup_columns(&headers, code_column, name_column)?;

        let mut directory = Self::new();
        for row in reader.records() {
            let row = row?;
            if let (Some(code), Some(name)) = (row.get(code_index), row.get(name_index)) {
                directory.insert(code, name);
            }
        }

        tracing::debug!(entries = directory.len(), "read drug directory");
        Ok(directory)
    }

    /// Read the first worksheet of an Excel workbook.
    ///
    /// The first row holds the headers. Numeric codes render without a
    /// fractional part.
    pub fn from_workbook(
        path: impl AsRef<Path>,
        code_column: &str,
        name_column: &str,
    ) -> Result<Self> {
        let mut workbook = calamine::open_workbook_auto(path.as_ref())?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ForecastError::Table("workbook has no worksheets".into()))??;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(|cell| header_name(&cell.to_string())).collect())
            .unwrap_or_default();
        let (code_index, name_index) = lookup_columns(&headers, code_column, name_column)?;

        let mut directory = Self::new();
        for row in rows {
            if let (Some(code), Some(name)) = (row.get(code_index), row.get(name_index)) {
                directory.insert(&code.to_string(), &name.to_string());
            }
        }

        tracing::debug!(entries = directory.len(), "read drug directory workbook");
        Ok(directory)
    }

    /// Read a lookup table from disk.
    ///
    /// `.xlsx`, `.xlsm` and `.xls` files are read as workbooks; anything else
    /// as CSV in `encoding`.
    pub fn from_path(
        path: impl AsRef<Path>,
        code_column: &str,
        name_column: &str,
        encoding: TextEncoding,
    ) -> Result<Self> {
        let path = path.as_ref();
        if is_workbook(path) {
            return Self::from_workbook(path, code_column, name_column);
        }
        let text = encoding.decode(&std::fs::read(path)?)?;
        Self::from_reader(text.as_bytes(), code_column, name_column)
    }

    /// Display name for a code, or `[code]` when unknown.
    pub fn display_name(&self, code: &str) -> String {
        let code = code.trim();
        self.names
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("[{}]", code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(code.trim())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn header_name(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').to_string()
}

fn lookup_columns(
    headers: &[String],
    code_column: &str,
    name_column: &str,
) -> Result<(usize, usize)> {
    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ForecastError::InputShape(column.to_string()))
    };
    Ok((find(code_column)?, find(name_column)?))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls"))
        .unwrap_or(false)
}

impl<'a> FromIterator<(&'a str, &'a str)> for DrugDirectory {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (code, name) in iter {
            directory.insert(code, name);
        }
        directory
    }
}
