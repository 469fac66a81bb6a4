//! Per-type column statistics.
//!
//! Each function works on the already-filtered non-missing cells of one column
//! and silently skips cells that do not parse for its type.

use indexmap::IndexMap;

use crate::types::{CellValue, DateRange, NumericStats, TopValue};
use crate::utils::{parse_date, parse_number, to_iso_string};

/// Quantile by sorted-index lookup: `sorted[floor(p * (n - 1))]`, no interpolation.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = (p * (sorted.len() - 1) as f64).floor() as usize;
    sorted.get(idx.min(sorted.len() - 1)).copied()
}

/// Min, quartiles, max and mean over the cells that parse as numbers.
///
/// Returns `None` when nothing parses.
pub fn numeric_stats(values: &[&CellValue]) -> Option<NumericStats> {
    let mut parsed: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
    if parsed.is_empty() {
        return None;
    }
    parsed.sort_by(|a, b| a.total_cmp(b));

    let mean = parsed.iter().sum::<f64>() / parsed.len() as f64;
    Some(NumericStats {
        min: *parsed.first()?,
        p25: quantile(&parsed, 0.25)?,
        p50: quantile(&parsed, 0.5)?,
        p75: quantile(&parsed, 0.75)?,
        max: *parsed.last()?,
        mean,
    })
}

/// Earliest and latest parseable dates.
pub fn date_range(values: &[&CellValue]) -> Option<DateRange> {
    let dates: Vec<_> = values.iter().filter_map(|v| parse_date(v)).collect();
    let start = dates.iter().min()?;
    let end = dates.iter().max()?;
    Some(DateRange {
        start: to_iso_string(start),
        end: to_iso_string(end),
    })
}

/// Most frequent values by descending count, ties in first-seen order.
pub fn top_values(values: &[&CellValue], limit: usize) -> Vec<TopValue> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value.as_key().into_owned()).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    // stable: equal counts keep insertion order
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
        .into_iter()
        .take(limit)
        .map(|(value, count)| TopValue { value, count })
        .collect()
}
