//! Shared parsing helpers for the profiling and chart pipelines.
//!
//! Cells arrive as loosely formatted text (`"$1,234"`, `"2024-03"`, `"Mar 2024"`).
//! The helpers here turn them into numbers and timestamps without ever failing:
//! absence of a value is `None`, never an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::types::CellValue;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

// =============================================================================
// Numeric Parsing
// =============================================================================

/// Characters stripped before numeric parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 3] = [',', '$', '%'];

/// Remove currency, percent and thousands formatting from a string.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(clean_numeric_string(" $1,234.56 "), "1234.56");
/// assert_eq!(clean_numeric_string("42%"), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    s.chars()
        .filter(|c| !NUMERIC_FORMAT_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a formatted string as a finite number.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Tolerant number parsing for a cell.
///
/// Numbers pass through when finite, text goes through [`parse_numeric_string`],
/// nulls and dates are never numbers.
pub fn parse_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_numeric_string(s),
        _ => None,
    }
}

// =============================================================================
// Date Parsing
// =============================================================================

const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 13] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%a, %d %b %Y",
];

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, with `-` or `/` separators.
static PARTIAL_ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(?:[-/](\d{2}))?(?:[-/](\d{2}))?$").expect("Invalid regex: ISO partial")
});

/// Permissive date/time parser.
///
/// Tries RFC 3339 and RFC 2822, a list of common datetime and date layouts,
/// month-year strings (`"March 2024"`), and ISO partials (`"2024"`, `"2024-03"`).
/// Offsets are normalized to UTC.
pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    // "March 2024" / "Mar 2024"
    let with_day = format!("1 {s}");
    for fmt in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    parse_partial_iso(s)
}

fn parse_partial_iso(s: &str) -> Option<NaiveDateTime> {
    let caps = PARTIAL_ISO_DATE.captures(s)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2).map_or(Some(1), |m| m.as_str().parse().ok())?;
    let day: u32 = caps.get(3).map_or(Some(1), |d| d.as_str().parse().ok())?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(NaiveTime::MIN))
}

/// Tolerant date parsing for a cell.
pub fn parse_date(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date_str(s),
        _ => None,
    }
}

/// Whether a cell looks like a calendar date.
///
/// Only text (and already-typed dates) qualify: a bare number is never
/// date-like, even when it could be read as a year.
pub fn is_date_like(value: &CellValue) -> bool {
    match value {
        CellValue::Date(_) => true,
        CellValue::Text(s) => {
            let s = s.trim();
            PARTIAL_ISO_DATE.is_match(s) || parse_date_str(s).is_some()
        }
        _ => false,
    }
}

/// ISO-8601 rendering used in profiles (`2024-03-01T00:00:00.000Z`).
pub fn to_iso_string(dt: &NaiveDateTime) -> String {
    dt.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Tests
// =============================================================================
