//! Reading raw visit tables and normalizing their fields.
//!
//! - Datetime normalization for plain and locale-formatted timestamps
//! - Visit record tables keyed by drug-code columns
//! - The drug-code to display-name directory (CSV or Excel)
//! - Decoding of UTF-8 and code page 949 exports

mod datetime;
mod directory;
mod encoding;
mod records;

pub use datetime::{
    NormalizeStats, TimestampFormat, DEFAULT_AFTERNOON_MARKER, DEFAULT_MORNING_MARKER,
};
pub use directory::{DrugDirectory, DEFAULT_CODE_COLUMN, DEFAULT_NAME_COLUMN};
pub use encoding::TextEncoding;
pub use records::{RecordSet, VisitRecord, DEFAULT_TIMESTAMP_COLUMN};
