//! Tabular input reading
//!
//! Turns an uploaded file into an ordered list of [`Row`]s plus its header list.
//! Three formats are understood, chosen by extension:
//! - delimited text (`.csv`), BOM-tolerant UTF-8
//! - native spreadsheets (`.xlsx`, `.xlsm`, `.xls`), first sheet only
//! - Numbers bundles (`.numbers`), which are ZIP archives that may embed a CSV export

mod delimited;
mod numbers;
mod spreadsheet;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_workbook;

use crate::error::InputError;
use crate::utils::extension_lower;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub use delimited::read_csv;
pub use numbers::read_numbers;
pub use spreadsheet::read_spreadsheet;

/// Columns every input must provide
pub const REQUIRED_COLUMNS: [&str; 3] = [COLUMN_LINK, COLUMN_ID, COLUMN_DATE];

/// Post URL column
pub const COLUMN_LINK: &str = "Link";
/// Owner identifier column
pub const COLUMN_ID: &str = "Id";
/// Post date column
pub const COLUMN_DATE: &str = "Date";

/// Extensions accepted by [`read_table`]
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["csv", "xlsx", "xlsm", "xls", "numbers"];

/// A single cell, kept as typed as the source format allows
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// Blank cell or a column missing from a short record
    #[default]
    Empty,
    /// Text cell (every CSV value is text)
    Text(String),
    /// Integer cell
    Int(i64),
    /// Floating-point cell
    Float(f64),
    /// Boolean cell
    Bool(bool),
    /// Spreadsheet date/time cell
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Whether the cell carries no content
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{i}"),
            // Integral floats (IDs, yyyymmdd dates typed as numbers) print without ".0"
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One data row, keyed by column name
///
/// When a header repeats, the right-most column wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, CellValue>,
}

impl Row {
    /// Build a row by zipping headers with values; missing values become `Empty`
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: Into<String>,
    {
        Self {
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Cell under `column`, or `Empty` if the column does not exist
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text of a cell
    pub fn text(&self, column: &str) -> String {
        self.get(column).to_string().trim().to_string()
    }

    /// Whether every cell is blank
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_empty)
    }
}

/// Headers plus rows, in file order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Header names in column order
    pub headers: Vec<String>,
    /// Data rows in file order
    pub rows: Vec<Row>,
}

impl Table {
    /// Fail with [`InputError::MissingColumn`] for the first absent required column
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), InputError> {
        match columns
            .iter()
            .find(|col| !self.headers.iter().any(|h| h.as_str() == **col))
        {
            Some(missing) => Err(InputError::MissingColumn {
                column: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Read any supported input file
///
/// # Errors
///
/// Returns [`InputError::UnsupportedFormat`] for unknown extensions or unusable
/// `.numbers` bundles, and a parse error when the file content is malformed.
///
/// # Example
///
/// ```no_run
/// use insta_batch_dl::input::read_table;
/// use std::path::Path;
///
/// let table = read_table(Path::new("links.xlsx"))?;
/// println!("{} rows, columns {:?}", table.rows.len(), table.headers);
/// # Ok::<(), insta_batch_dl::error::InputError>(())
/// ```
pub fn read_table(path: &Path) -> Result<Table, InputError> {
    let ext = extension_lower(path).unwrap_or_default();
    debug!(?path, extension = %ext, "reading input table");

    let table = match ext.as_str() {
        "csv" => read_csv(path)?,
        "numbers" => read_numbers(path)?,
        "xlsx" | "xlsm" | "xls" => read_spreadsheet(path)?,
        _ => {
            return Err(InputError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: "엑셀, CSV, Numbers 파일만 지원합니다".to_string(),
            });
        }
    };

    info!(
        ?path,
        rows = table.rows.len(),
        columns = table.headers.len(),
        "input table loaded"
    );
    Ok(table)
}

/// Whether a file name has an extension [`read_table`] accepts
pub fn is_supported_file_name(name: &str) -> bool {
    extension_lower(Path::new(name))
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
