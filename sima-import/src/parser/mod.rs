//! Row parsers
//!
//! Each supported upload format provides one [`RowParser`] implementation
//! producing the same output shape: an ordered list of raw column-name →
//! value maps, one per data row. Format selection happens once, by file
//! extension; nothing downstream branches on the format again.

pub mod csv_parser;

use crate::error::{ImportError, ImportResult};
use std::collections::BTreeMap;

pub use csv_parser::CsvParser;

/// One raw spreadsheet row: column header → cell value.
///
/// BTreeMap keeps iteration deterministic for logging and tests.
pub type RowMap = BTreeMap<String, String>;

/// Format-specific upload parser
pub trait RowParser {
    /// Parse raw file bytes into rows. Fully blank rows are skipped and a
    /// UTF-8 BOM on the first header cell is tolerated.
    fn parse(&self, bytes: &[u8]) -> ImportResult<Vec<RowMap>>;
}

/// Select a parser for a file extension tag (lowercased, without dot)
pub fn parser_for_extension(extension: &str) -> ImportResult<Box<dyn RowParser + Send + Sync>> {
    match extension.to_ascii_lowercase().as_str() {
        "csv" | "txt" => Ok(Box::new(CsvParser::new())),
        other => Err(ImportError::UnsupportedFormat(other.to_string())),
    }
}

/// Extension of an uploaded filename, lowercased
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            parser_for_extension("pdf"),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn extension_extraction() {
        assert_eq!(file_extension("anggota.CSV"), "csv");
        assert_eq!(file_extension("no_extension"), "");
        assert_eq!(file_extension("a.b.csv"), "csv");
    }
}
