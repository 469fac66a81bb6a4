//! Histogram binning with "nice" bin widths.

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};
use crate::types::{CellValue, format_number};
use crate::utils::parse_number;

/// Multipliers of the power of ten tried as bin widths, smallest first.
const NICE_MULTIPLIERS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

/// One bin, `[lower_bound, upper_bound)` except the last which also holds the max.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub label: String,
}

/// Bin count used for rendering: 30 above 400 values, 20 above 100, else 12.
pub fn adaptive_bin_count(value_count: usize) -> usize {
    if value_count > 400 {
        30
    } else if value_count > 100 {
        20
    } else {
        12
    }
}

/// Smallest of `{1, 2, 5, 10} x 10^floor(log10(range / bins))` that fits the
/// range into `bins` bins, or the largest candidate when none does.
pub fn nice_bin_width(range: f64, bins: usize) -> f64 {
    let bins = bins.max(1) as f64;
    let raw = range / bins;
    let pow10 = 10f64.powf(raw.log10().floor());
    let mut width = NICE_MULTIPLIERS[0] * pow10;
    for multiplier in NICE_MULTIPLIERS {
        width = multiplier * pow10;
        if range / width <= bins {
            break;
        }
    }
    width
}

/// Bin every value that parses to a finite number.
///
/// Only non-empty bins are returned, in ascending order. A single distinct
/// value yields one bin holding every input. Fails only when the range is too
/// extreme for a usable bin width.
pub fn create_histogram_data<'a, I>(values: I, bin_count: usize) -> Result<Vec<HistogramBin>>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let numbers: Vec<f64> = values.into_iter().filter_map(parse_number).collect();
    if numbers.is_empty() {
        return Ok(Vec::new());
    }

    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return Ok(vec![HistogramBin {
            lower_bound: min,
            upper_bound: max,
            count: numbers.len(),
            label: format!("{} - {}", format_number(min), format_number(max)),
        }]);
    }

    let range = max - min;
    let width = nice_bin_width(range, bin_count);
    if !width.is_finite() || width <= 0.0 {
        return Err(InsightError::ChartProcessing(format!(
            "no usable bin width for range {min}..{max}"
        )));
    }

    let start = (min / width).floor() * width;
    let count = ((max - start) / width).ceil().max(1.0);
    if !count.is_finite() || count > (bin_count.max(1) * 10) as f64 {
        return Err(InsightError::ChartProcessing(format!(
            "bin count {count} out of bounds for width {width}"
        )));
    }
    let count = count as usize;

    let mut counts = vec![0usize; count];
    for value in &numbers {
        let idx = ((value - start) / width).floor().clamp(0.0, (count - 1) as f64) as usize;
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .filter(|(_, n)| *n > 0)
        .map(|(i, n)| {
            let lower = start + i as f64 * width;
            let upper = start + (i + 1) as f64 * width;
            HistogramBin {
                lower_bound: lower,
                upper_bound: upper,
                count: n,
                label: format!(
                    "{} - {}",
                    format_bound(lower, width),
                    format_bound(upper, width)
                ),
            }
        })
        .collect())
}

/// Whole numbers for wide bins, one decimal otherwise (`2.0` prints as `2`).
fn format_bound(n: f64, width: f64) -> String {
    if width >= 10.0 {
        format_number(n.floor())
    } else {
        format_number((n * 10.0).round() / 10.0)
    }
}
