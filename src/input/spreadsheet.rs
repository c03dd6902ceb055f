//! Native spreadsheet reader (xlsx / xlsm / xls)

use super::{CellValue, Row, Table};
use crate::error::InputError;
use crate::utils::extension_lower;
use calamine::{Data, DataType, Reader, Sheets, Xls, Xlsx, open_workbook};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read the first sheet of a workbook; row 1 is the header
///
/// Cells keep their native type, so a date typed into Excel arrives as
/// [`CellValue::DateTime`] instead of its serial number. Rows whose cells are all
/// blank (formatting left below the data) are skipped.
pub fn read_spreadsheet(path: &Path) -> Result<Table, InputError> {
    let mut workbook = open_sheets(path).map_err(|e| InputError::Spreadsheet {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(InputError::Spreadsheet {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
        None => {
            debug!(?path, "workbook has no sheets");
            return Ok(Table::default());
        }
    };

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_from_data(cell).to_string().trim().to_string())
            .collect(),
        None => return Ok(Table::default()),
    };

    let rows = rows_iter
        .map(|cells| {
            Row::from_pairs(headers.iter().enumerate().map(|(i, header)| {
                let value = cells.get(i).map(cell_from_data).unwrap_or_default();
                (header.clone(), value)
            }))
        })
        .filter(|row| !row.is_blank())
        .collect();

    Ok(Table { headers, rows })
}

/// Open `.xls` as BIFF and everything else as OOXML, whatever the extension's case
fn open_sheets(path: &Path) -> Result<Sheets<BufReader<File>>, calamine::Error> {
    match extension_lower(path).as_deref() {
        Some("xls") => open_workbook::<Xls<_>, _>(path)
            .map(Sheets::Xls)
            .map_err(calamine::Error::Xls),
        _ => open_workbook::<Xlsx<_>, _>(path)
            .map(Sheets::Xlsx)
            .map_err(calamine::Error::Xlsx),
    }
}

/// Convert a calamine cell into our typed cell
pub(crate) fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(data.to_string())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
