//! Delimited-text (CSV) reader

use super::{CellValue, Row, Table};
use crate::error::InputError;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a CSV file whose first line is the header
///
/// A leading UTF-8 byte-order mark is dropped, which is what spreadsheet apps put
/// at the start of "CSV UTF-8" exports.
pub fn read_csv(path: &Path) -> Result<Table, InputError> {
    let bytes = std::fs::read(path).map_err(|e| InputError::Csv {
        path: path.to_path_buf(),
        reason: format!("failed to read file: {}", e),
    })?;
    parse_csv_bytes(&bytes, path)
}

/// Parse CSV content already in memory; `path` is only used for error context
pub(crate) fn parse_csv_bytes(bytes: &[u8], path: &Path) -> Result<Table, InputError> {
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let row = Row::from_pairs(headers.iter().enumerate().map(|(i, header)| {
            let value = record
                .get(i)
                .map(|v| CellValue::Text(v.to_string()))
                .unwrap_or(CellValue::Empty);
            (header.clone(), value)
        }));
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn csv_error(path: &Path, e: csv::Error) -> InputError {
    InputError::Csv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
