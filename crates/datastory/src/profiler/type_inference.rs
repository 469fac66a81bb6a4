//! Type inference logic for column analysis.

use crate::types::{CellValue, ColumnType};
use crate::utils::{is_date_like, parse_number};

/// Share of the sample that must be date-like for a temporal column.
pub const TEMPORAL_THRESHOLD: f64 = 0.5;

/// Share of the sample that must parse as numbers for a numeric column.
pub const NUMERIC_THRESHOLD: f64 = 0.7;

/// Classify a column from the first `window` non-missing values.
///
/// The temporal check runs first with the lower threshold: bare years and
/// `YYYY-MM` strings also parse as numbers and would otherwise be read as
/// numeric.
pub fn infer_column_type<'a, I>(values: I, window: usize) -> ColumnType
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let sample: Vec<&CellValue> = values
        .into_iter()
        .filter(|v| !v.is_missing())
        .take(window)
        .collect();

    if sample.is_empty() {
        return ColumnType::Categorical;
    }

    let size = sample.len() as f64;
    let date_count = sample.iter().filter(|v| is_date_like(v)).count();
    if date_count as f64 > TEMPORAL_THRESHOLD * size {
        return ColumnType::Temporal;
    }

    let number_count = sample.iter().filter(|v| parse_number(v).is_some()).count();
    if number_count as f64 > NUMERIC_THRESHOLD * size {
        return ColumnType::Numeric;
    }

    ColumnType::Categorical
}

/// Share of non-missing values that parse as numbers (0.0 when there are none).
pub fn numeric_ratio<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut total = 0usize;
    let mut numeric = 0usize;
    for value in values.into_iter().filter(|v| !v.is_missing()) {
        total += 1;
        if parse_number(value).is_some() {
            numeric += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        numeric as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    #[test]
    fn test_infer_type_temporal_majority() {
        let values = cells(&["2021-01-01", "2021-02-01", "2021-03-01", "x", "y"]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Temporal);
    }

    #[test]
    fn test_infer_type_numeric_majority() {
        let values = cells(&["1", "2", "3", "abc"]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Numeric);
    }

    #[test]
    fn test_infer_type_categorical() {
        let values = cells(&["red", "blue", "green", "red"]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Categorical);
    }

    #[test]
    fn test_infer_type_empty_sample_is_categorical() {
        let values = cells(&["", "", ""]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Categorical);
        assert_eq!(infer_column_type(&[], 50), ColumnType::Categorical);
    }

    #[test]
    fn test_infer_type_years_are_temporal() {
        let values = cells(&["1999", "2000", "2001", "2002"]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Temporal);
    }

    #[test]
    fn test_infer_type_exact_threshold_is_not_enough() {
        // 70% numeric is not strictly above the threshold
        let values = cells(&["1", "2", "3", "4", "5", "6", "7", "a", "b", "c"]);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Categorical);
    }

    #[test]
    fn test_infer_type_window_ignores_tail() {
        let mut values = cells(&["a", "b", "c"]);
        values.extend(cells(&["1"; 20]));
        assert_eq!(infer_column_type(&values, 3), ColumnType::Categorical);
        assert_eq!(infer_column_type(&values, 50), ColumnType::Numeric);
    }

    #[test]
    fn test_infer_type_skips_missing_before_windowing() {
        let mut values = cells(&["", "", ""]);
        values.push(CellValue::Null);
        values.extend(cells(&["10", "20"]));
        assert_eq!(infer_column_type(&values, 2), ColumnType::Numeric);
    }

    #[test]
    fn test_native_numbers_are_numeric() {
        let values = vec![CellValue::Number(1.0), CellValue::Number(2.5)];
        assert_eq!(infer_column_type(&values, 50), ColumnType::Numeric);
    }

    #[test]
    fn test_numeric_ratio() {
        let values = cells(&["1", "2", "x", "", "4"]);
        assert!((numeric_ratio(&values) - 0.75).abs() < 1e-12);
        assert_eq!(numeric_ratio(&[]), 0.0);
    }
}
