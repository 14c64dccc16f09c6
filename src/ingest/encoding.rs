//! Text encodings of exported tables.
//!
//! Clinic systems commonly export Windows code page 949 (an EUC-KR
//! superset). Tables are decoded to UTF-8 before CSV parsing.

use crate::error::{ForecastError, Result};
use encoding_rs::{Encoding, EUC_KR, UTF_8};
use serde::{Deserialize, Serialize};

/// Character encoding of an input table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// UTF-8 when the bytes are valid UTF-8, code page 949 otherwise.
    #[default]
    Auto,
    Utf8,
    /// Windows code page 949 / EUC-KR.
    Cp949,
}

impl TextEncoding {
    fn resolve(&self, bytes: &[u8]) -> &'static Encoding {
        match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Cp949 => EUC_KR,
            TextEncoding::Auto if Encoding::utf8_valid_up_to(bytes) == bytes.len() => UTF_8,
            TextEncoding::Auto => EUC_KR,
        }
    }

    /// Decode raw table bytes, dropping a leading byte order mark.
    ///
    /// Malformed sequences fail instead of being replaced.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let encoding = self.resolve(bytes);
        let (text, malformed) = encoding.decode_with_bom_removal(bytes);
        if malformed {
            return Err(ForecastError::Table(format!(
                "input is not valid {}",
                encoding.name()
            )));
        }
        tracing::debug!(encoding = encoding.name(), bytes = bytes.len(), "decoded table");
        Ok(text.into_owned())
    }
}
