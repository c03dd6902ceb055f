//! Date normalization into the `yy.mm.dd` folder name

use crate::input::CellValue;
use crate::utils::sanitize_filename;
use chrono::{NaiveDate, NaiveDateTime};

/// Output format of every normalized date
const CANONICAL_FORMAT: &str = "%y.%m.%d";

/// Date-only patterns, tried in order; the first that parses wins.
///
/// Four-digit-year forms come before their two-digit counterparts, and the
/// month-first US form shadows the day-first form for ambiguous input.
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y년%m월%d일",
    "%Y년 %m월 %d일",
    "%y-%m-%d",
    "%y/%m/%d",
    "%y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y%m%d",
];

/// Timestamp forms produced by spreadsheet CSV exports
const DATETIME_PATTERNS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Normalize a cell into `yy.mm.dd`
///
/// Structured date/time cells are formatted directly. Anything else is coerced to
/// trimmed text and matched against a fixed pattern list. Text that matches no
/// pattern is returned sanitized but otherwise unchanged, so a malformed date
/// never aborts a batch.
///
/// # Examples
///
/// ```
/// use insta_batch_dl::date::normalize_date;
/// use insta_batch_dl::input::CellValue;
///
/// assert_eq!(normalize_date(&CellValue::from("2024-01-01")), "24.01.01");
/// assert_eq!(normalize_date(&CellValue::from("2024년01월01일")), "24.01.01");
/// assert_eq!(normalize_date(&CellValue::from("not a date")), "not a date");
/// ```
#[must_use]
pub fn normalize_date(value: &CellValue) -> String {
    if let CellValue::DateTime(dt) = value {
        return dt.format(CANONICAL_FORMAT).to_string();
    }
    normalize_date_str(&value.to_string())
}

/// Text-only variant of [`normalize_date`]
#[must_use]
pub fn normalize_date_str(raw: &str) -> String {
    let text = raw.trim();

    parse_date(text)
        .map(|date| date.format(CANONICAL_FORMAT).to_string())
        .unwrap_or_else(|| sanitize_filename(text))
}

/// Try every known pattern in order
fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    DATE_PATTERNS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_PATTERNS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}
