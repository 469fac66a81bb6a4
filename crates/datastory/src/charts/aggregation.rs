//! Grouping of rows by x value and the count/sum/avg reductions over them.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::debug;

use super::{AxisValue, SeriesPoint};
use crate::error::{InsightError, Result};
use crate::types::{ColumnType, Row};
use crate::utils::{parse_date_str, parse_number, parse_numeric_string};

/// Label of the synthetic bucket that absorbs categories beyond the cap.
pub const OTHER_CATEGORY: &str = "Other";

/// Reduction applied to each x group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Count,
    Sum,
    Avg,
}

/// Running totals for one x group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bucket {
    pub sum: f64,
    pub count: usize,
}

impl Bucket {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Count => self.count as f64,
            Metric::Sum => self.sum,
            Metric::Avg if self.count > 0 => self.sum / self.count as f64,
            Metric::Avg => 0.0,
        }
    }

    fn merge(&mut self, other: &Bucket) {
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Group rows with a present x value by the x key, first-seen order.
///
/// When `y_key` is set, unparseable y cells contribute 0 to the sum but still
/// count toward the group size.
pub fn group_rows(
    rows: &[Row],
    x_key: &str,
    y_key: Option<&str>,
    trim_keys: bool,
) -> IndexMap<String, Bucket> {
    let mut groups: IndexMap<String, Bucket> = IndexMap::new();
    for row in rows {
        let x = row.get(x_key);
        if x.is_missing() {
            continue;
        }
        let raw = x.as_key();
        let key = if trim_keys { raw.trim() } else { raw.as_ref() };
        let bucket = groups.entry(key.to_string()).or_default();
        bucket.count += 1;
        if let Some(y) = y_key {
            bucket.sum += parse_number(row.get(y)).unwrap_or(0.0);
        }
    }
    groups
}

/// Turn groups into sorted points along an axis of type `axis`.
///
/// Numeric axes sort ascending by parsed key (unparseable keys read as 0),
/// temporal axes chronologically, categorical axes by key. Only a
/// categorical axis with more than `max_categories` keys is capped: the
/// tail folds into [`OTHER_CATEGORY`] and the result is ordered by
/// descending value.
pub fn aggregate(
    groups: IndexMap<String, Bucket>,
    metric: Metric,
    axis: ColumnType,
    max_categories: usize,
) -> Result<Vec<SeriesPoint>> {
    let mut entries: Vec<(AxisValue, Bucket)> = groups
        .into_iter()
        .map(|(key, bucket)| {
            let x = match axis {
                ColumnType::Numeric => AxisValue::Number(parse_numeric_string(&key).unwrap_or(0.0)),
                _ => AxisValue::Text(key),
            };
            (x, bucket)
        })
        .collect();

    match axis {
        ColumnType::Temporal => entries.sort_by(|a, b| by_time(&a.0, &b.0)),
        _ => entries.sort_by(|a, b| a.0.cmp_axis(&b.0)),
    }

    if axis == ColumnType::Categorical && entries.len() > max_categories {
        entries.sort_by(|a, b| by_value_desc(a.1.value(metric), b.1.value(metric)));
        let rest = entries.split_off(max_categories);
        let mut other = Bucket::default();
        for (_, bucket) in &rest {
            other.merge(bucket);
        }
        debug!(
            kept = entries.len(),
            folded = rest.len(),
            "Folded low-ranked categories into '{}'",
            OTHER_CATEGORY
        );
        entries.push((AxisValue::Text(OTHER_CATEGORY.to_string()), other));
        entries.sort_by(|a, b| by_value_desc(a.1.value(metric), b.1.value(metric)));
    }

    to_points(entries, metric)
}

/// Safety-net grouping for bar charts: raw keys, lexicographic order, no cap.
pub fn aggregate_implicit(groups: IndexMap<String, Bucket>, metric: Metric) -> Result<Vec<SeriesPoint>> {
    let mut entries: Vec<(AxisValue, Bucket)> = groups
        .into_iter()
        .map(|(key, bucket)| (AxisValue::Text(key), bucket))
        .collect();
    entries.sort_by(|a, b| a.0.cmp_axis(&b.0));
    to_points(entries, metric)
}

fn to_points(entries: Vec<(AxisValue, Bucket)>, metric: Metric) -> Result<Vec<SeriesPoint>> {
    entries
        .into_iter()
        .map(|(x, bucket)| {
            let value = bucket.value(metric);
            if !value.is_finite() {
                return Err(InsightError::ChartProcessing(format!(
                    "{metric:?} for '{x}' is not finite"
                )));
            }
            Ok(SeriesPoint::new(x, value))
        })
        .collect()
}

fn by_value_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Parseable dates first in time order, then the rest by text.
fn by_time(a: &AxisValue, b: &AxisValue) -> Ordering {
    let time = |x: &AxisValue| match x {
        AxisValue::Text(s) => parse_date_str(s),
        AxisValue::Number(_) => None,
    };
    match (time(a), time(b)) {
        (Some(ta), Some(tb)) => ta.cmp(&tb).then_with(|| a.cmp_axis(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp_axis(b),
    }
}
