//! CSV ingestion into typed [`Dataset`]s.
//!
//! CSV files are read through polars with schema inference disabled, so
//! every cell arrives as a string and is typed once by
//! [`CellValue::from_raw`]. The first record is validated as a header row
//! before any data row is converted.

use crate::error::{InsightError, Result, ResultExt};
use crate::types::{CellValue, Dataset, Row};
use crate::utils::{clean_numeric_string, is_datetime_dtype, is_numeric_dtype, parse_date_str};
use once_cell::sync::Lazy;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Duplicate names listed in a header error.
const MAX_REPORTED_DUPLICATES: usize = 5;

static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d+(?:\.\d+)?$").expect("Invalid regex: plain number"));
static YEAR_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}([-/ ]\d{2}){0,2}$").expect("Invalid regex: year-like"));

fn raw_reader_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
}

/// Load a CSV file, naming the dataset after the file stem.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string();

    let df = raw_reader_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read {}", path.display()))?;

    let dataset = dataset_from_raw_frame(&df, name)?;
    info!(
        dataset = %dataset.name,
        rows = dataset.row_count(),
        columns = dataset.columns.len(),
        "Loaded CSV"
    );
    Ok(dataset)
}

/// Load CSV text already in memory.
pub fn load_csv_from_str(text: &str, name: impl Into<String>) -> Result<Dataset> {
    if text.trim().is_empty() {
        return Err(InsightError::EmptyDataset);
    }
    let df = raw_reader_options()
        .into_reader_with_file_handle(Cursor::new(text.to_string()))
        .finish()
        .context("Failed to parse CSV text")?;
    dataset_from_raw_frame(&df, name.into())
}

/// Build a dataset from a headerless all-string frame whose first row holds
/// the column names.
fn dataset_from_raw_frame(df: &DataFrame, name: String) -> Result<Dataset> {
    if df.width() == 0 || df.height() == 0 {
        return Err(InsightError::EmptyDataset);
    }

    let chunks = df
        .get_columns()
        .iter()
        .map(|c| c.str())
        .collect::<PolarsResult<Vec<_>>>()
        .context("CSV columns are not string typed")?;

    let header: Vec<String> = chunks
        .iter()
        .map(|ca| ca.get(0).unwrap_or_default().trim().to_string())
        .collect();
    validate_header(&header)?;

    let rows: Vec<Row> = (1..df.height())
        .map(|i| {
            let mut row = Row::with_capacity(header.len());
            for (column, ca) in header.iter().zip(&chunks) {
                row.insert(column.clone(), CellValue::from_raw(ca.get(i).unwrap_or_default()));
            }
            row
        })
        .filter(|row| row.columns().any(|c| !row.get(c).is_missing()))
        .collect();

    debug!(rows = rows.len(), "Converted CSV records");
    Ok(Dataset::new(name, header, rows))
}

fn looks_like_data(cell: &str) -> bool {
    if cell.is_empty() {
        return false;
    }
    PLAIN_NUMBER.is_match(&clean_numeric_string(cell)) || parse_date_str(cell).is_some() || YEAR_LIKE.is_match(cell)
}

/// Check that `cells` is usable as a header row.
///
/// Rejects blank names, names repeated ignoring case, and rows in which
/// every cell is a number or a date. All detected problems are reported in
/// one [`InsightError::InvalidHeader`].
pub fn validate_header(cells: &[String]) -> Result<()> {
    let cells: Vec<&str> = cells.iter().map(|c| c.trim()).collect();
    let mut reasons = Vec::new();

    if cells.iter().any(|c| c.is_empty()) {
        reasons.push("blank column name(s)".to_string());
    }

    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for cell in &cells {
        if !seen.insert(cell.to_lowercase()) && !duplicates.contains(cell) {
            duplicates.push(cell);
        }
    }
    if !duplicates.is_empty() {
        let shown: Vec<&str> = duplicates.into_iter().take(MAX_REPORTED_DUPLICATES).collect();
        reasons.push(format!("duplicate column name(s): {}", shown.join(", ")));
    }

    if !cells.is_empty() && cells.iter().all(|c| looks_like_data(c)) {
        reasons.push("first row appears to contain data, not column titles".to_string());
    }

    if reasons.is_empty() {
        return Ok(());
    }
    Err(InsightError::InvalidHeader(format!(
        "The first row must contain column titles. Detected {}. Please include a header row like: Name,Age,Country.",
        reasons.join("; ")
    )))
}

impl Dataset {
    /// Convert a polars frame with named columns.
    ///
    /// Numeric columns become [`CellValue::Number`], date and datetime
    /// columns [`CellValue::Date`], everything else text.
    pub fn from_dataframe(df: &DataFrame, name: impl Into<String>) -> Result<Self> {
        let columns: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
        let mut cells: Vec<Vec<CellValue>> = Vec::with_capacity(columns.len());

        for column in df.get_columns() {
            let dtype = column.dtype();
            let values: Vec<CellValue> = if is_numeric_dtype(dtype) {
                column
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.map_or(CellValue::Null, CellValue::Number))
                    .collect()
            } else {
                let is_date = is_datetime_dtype(dtype);
                column
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|v| match v {
                        Some(s) if is_date => parse_date_str(s).map_or(CellValue::Null, CellValue::Date),
                        other => CellValue::from(other),
                    })
                    .collect()
            };
            cells.push(values);
        }

        let rows = (0..df.height())
            .map(|i| {
                let mut row = Row::with_capacity(columns.len());
                for (column, values) in columns.iter().zip(&cells) {
                    row.insert(column.clone(), values[i].clone());
                }
                row
            })
            .collect();

        Ok(Dataset::new(name, columns, rows))
    }
}
