//! CSV upload parser
//!
//! Accepts comma or semicolon delimited files (legacy exports from
//! spreadsheet tools use `;`). The delimiter is sniffed from the header
//! line.

use super::{RowMap, RowParser};
use crate::error::{ImportError, ImportResult};

/// CSV implementation of [`RowParser`]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Pick `;` when the header line contains more semicolons than commas
    fn sniff_delimiter(bytes: &[u8]) -> u8 {
        let header = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
        let commas = header.iter().filter(|&&b| b == b',').count();
        let semis = header.iter().filter(|&&b| b == b';').count();
        if semis > commas {
            b';'
        } else {
            b','
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RowParser for CsvParser {
    fn parse(&self, bytes: &[u8]) -> ImportResult<Vec<RowMap>> {
        let delimiter = Self::sniff_delimiter(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ImportError::Parse(format!("unreadable header row: {e}")))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Spreadsheet exports often prefix the first header cell
                // with a UTF-8 BOM
                let h = if i == 0 {
                    h.trim_start_matches('\u{feff}')
                } else {
                    h
                };
                h.trim().to_string()
            })
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::Parse("file has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| ImportError::Parse(format!("unreadable row: {e}")))?;

            // Skip fully blank rows
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut row = RowMap::new();
            for (i, cell) in record.iter().enumerate() {
                let value = cell.trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(header) = headers.get(i) {
                    if !header.is_empty() {
                        row.insert(header.clone(), value.to_string());
                    }
                }
            }
            rows.push(row);
        }

        Ok(rows)
    }
}
