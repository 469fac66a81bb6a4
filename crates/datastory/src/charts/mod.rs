//! Chart data derivation.
//!
//! Turns a persisted [`ChartSpecification`] plus a row set into renderable
//! series: histogram bins, count/sum/avg aggregates with category capping,
//! or one point per row. The decision order matters; later rules only run
//! when earlier ones do not apply:
//!
//! 1. validate the x/y columns against the dataset schema
//! 2. keep non-missing x values (nothing left is [`ChartOutcome::NoData`])
//! 3. histogram charts bin directly
//! 4. re-detect the x type from the live values
//! 5. high-cardinality numeric bar charts without y become histograms
//! 6. count aggregation (explicit, or no y on a non-scatter chart)
//! 7. sum aggregation
//! 8. avg aggregation
//! 9. implicit grouping for bar charts over categorical or duplicated x
//! 10. raw points, one per row
//! 11. long temporal line/area series are flagged for scatter rendering

pub mod aggregation;
pub mod histogram;
mod labels;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use rand::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::profiler::{infer_column_type, numeric_ratio};
use crate::types::{Aggregation, CellValue, ChartSpecification, ChartType, ColumnType, Dataset, Row};
use crate::utils::parse_number;

use aggregation::{Metric, aggregate, aggregate_implicit, group_rows};
pub use aggregation::OTHER_CATEGORY;
pub use histogram::{HistogramBin, adaptive_bin_count, create_histogram_data, nice_bin_width};
pub use labels::{chart_title, plot_label};

/// Key used for the y axis when the chart has no y column.
pub const DEFAULT_VALUE_KEY: &str = "value";

/// An x-axis position: numeric when the axis is numeric, otherwise text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

impl AxisValue {
    /// Numbers ascending, text by byte order; numbers sort before text.
    pub fn cmp_axis(&self, other: &AxisValue) -> Ordering {
        match (self, other) {
            (AxisValue::Number(a), AxisValue::Number(b)) => a.total_cmp(b),
            (AxisValue::Text(a), AxisValue::Text(b)) => a.cmp(b),
            (AxisValue::Number(_), AxisValue::Text(_)) => Ordering::Less,
            (AxisValue::Text(_), AxisValue::Number(_)) => Ordering::Greater,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AxisValue::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            AxisValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Number(n) => write!(f, "{n}"),
            AxisValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub x: AxisValue,
    pub value: f64,
    /// Position of the source row, set for raw points only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_index: Option<usize>,
    /// `(lower, upper)` for histogram bins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(f64, f64)>,
}

impl SeriesPoint {
    pub fn new(x: AxisValue, value: f64) -> Self {
        Self {
            x,
            value,
            original_index: None,
            bounds: None,
        }
    }
}

/// Which rule produced a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Histogram,
    Count,
    Sum,
    Avg,
    Raw,
}

/// Renderable data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub kind: SeriesKind,
    /// Record key holding the x value (the chart's x column).
    pub x_key: String,
    /// Record key holding the y value: the y column, or [`DEFAULT_VALUE_KEY`].
    pub value_key: String,
    pub points: Vec<SeriesPoint>,
    /// Rendering hint: draw as scatter instead of a connected line.
    pub force_scatter: bool,
}

impl ChartSeries {
    fn new(kind: SeriesKind, x_key: &str, value_key: &str, points: Vec<SeriesPoint>) -> Self {
        Self {
            kind,
            x_key: x_key.to_string(),
            value_key: value_key.to_string(),
            points,
            force_scatter: false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as `{xKey: x, valueKey: value}` records for a charting layer.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.points
            .iter()
            .map(|point| {
                let mut record = serde_json::Map::new();
                record.insert(self.x_key.clone(), point.x.to_json());
                record.insert(
                    self.value_key.clone(),
                    serde_json::Number::from_f64(point.value)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number),
                );
                serde_json::Value::Object(record)
            })
            .collect()
    }

    /// The points actually drawn: capped at `max_render_points`, and at
    /// `max_pie_slices` for pie charts.
    pub fn display_points(&self, chart_type: ChartType, config: &EngineConfig) -> &[SeriesPoint] {
        let mut limit = config.max_render_points;
        if chart_type == ChartType::Pie {
            limit = limit.min(config.max_pie_slices);
        }
        &self.points[..self.points.len().min(limit)]
    }
}

/// Why a chart specification cannot be rendered against a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ChartConfigError {
    #[error("No X-axis column specified for this chart")]
    MissingXKey,

    #[error("Column '{column}' not found. Available: {}", .available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Aggregation '{}' needs a Y-axis column", .aggregation.as_str())]
    MissingYKey { aggregation: Aggregation },
}

/// Result of deriving chart data. Callers branch on it; nothing here panics
/// or propagates an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ChartOutcome {
    Ready(ChartSeries),
    /// Valid configuration, but no usable values.
    NoData,
    InvalidConfig(ChartConfigError),
    ProcessingError(String),
}

impl ChartOutcome {
    pub fn series(&self) -> Option<&ChartSeries> {
        match self {
            ChartOutcome::Ready(series) => Some(series),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ChartOutcome::Ready(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            ChartOutcome::Ready(_) => "ready",
            ChartOutcome::NoData => "no_data",
            ChartOutcome::InvalidConfig(_) => "invalid_config",
            ChartOutcome::ProcessingError(_) => "processing_error",
        }
    }
}

/// Derives [`ChartSeries`] from rows and a chart specification.
#[derive(Debug, Clone)]
pub struct ChartDataProcessor {
    type_window: usize,
    numeric_axis_ratio: f64,
    max_categories: usize,
    temporal_scatter_threshold: usize,
    jitter_seed: u64,
}

impl Default for ChartDataProcessor {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ChartDataProcessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            type_window: config.render_type_window,
            numeric_axis_ratio: config.numeric_axis_ratio,
            max_categories: config.max_categories,
            temporal_scatter_threshold: config.temporal_scatter_threshold,
            jitter_seed: config.jitter_seed,
        }
    }

    pub fn process(&self, dataset: &Dataset, chart: &ChartSpecification) -> ChartOutcome {
        self.process_rows(&dataset.rows, &dataset.columns, chart)
    }

    /// Derive chart data for `rows` whose schema is `columns`.
    pub fn process_rows(
        &self,
        rows: &[Row],
        columns: &[String],
        chart: &ChartSpecification,
    ) -> ChartOutcome {
        let x_key = chart.spec.x_key.as_str();
        if x_key.trim().is_empty() {
            return ChartOutcome::InvalidConfig(ChartConfigError::MissingXKey);
        }
        let y_key = chart.y_key();
        if y_key.is_none() && chart.spec.aggregation.needs_y() {
            return ChartOutcome::InvalidConfig(ChartConfigError::MissingYKey {
                aggregation: chart.spec.aggregation,
            });
        }
        for key in std::iter::once(x_key).chain(y_key) {
            if !columns.iter().any(|c| c == key) {
                return ChartOutcome::InvalidConfig(ChartConfigError::UnknownColumn {
                    column: key.to_string(),
                    available: columns.to_vec(),
                });
            }
        }

        match self.derive(rows, x_key, y_key, chart) {
            Ok(Some(series)) => ChartOutcome::Ready(series),
            Ok(None) => ChartOutcome::NoData,
            Err(e) => {
                warn!(x_key, chart_type = %chart.chart_type, error = %e, "Chart data processing failed");
                ChartOutcome::ProcessingError(e.to_string())
            }
        }
    }

    fn derive(
        &self,
        rows: &[Row],
        x_key: &str,
        y_key: Option<&str>,
        chart: &ChartSpecification,
    ) -> Result<Option<ChartSeries>> {
        let chart_type = chart.chart_type;
        let x_values: Vec<&CellValue> = rows
            .iter()
            .map(|row| row.get(x_key))
            .filter(|v| !v.is_missing())
            .collect();
        if x_values.is_empty() {
            debug!(x_key, "No usable x values");
            return Ok(None);
        }

        if chart_type == ChartType::Histogram {
            return self.histogram(&x_values, x_key);
        }

        let actual = infer_column_type(x_values.iter().copied(), self.type_window);
        let looks_numeric = numeric_ratio(x_values.iter().copied()) >= self.numeric_axis_ratio;
        let numeric_axis = looks_numeric || actual == ColumnType::Numeric;
        let axis = if numeric_axis { ColumnType::Numeric } else { actual };
        if let Some(declared) = chart.spec.data_type
            && declared != actual
        {
            debug!(x_key, %declared, %actual, "Declared data type differs from detected type");
        }

        let distinct = x_values.iter().map(|v| v.as_key()).collect::<HashSet<_>>().len();

        if chart_type.is_bar_like() && y_key.is_none() && numeric_axis && distinct > self.max_categories {
            debug!(x_key, distinct, "Converting high-cardinality numeric bar chart to histogram");
            return self.histogram(&x_values, x_key);
        }

        let aggregation = chart.spec.aggregation;
        if aggregation == Aggregation::Count || (y_key.is_none() && chart_type != ChartType::Scatter) {
            let groups = group_rows(rows, x_key, None, true);
            let points = aggregate(groups, Metric::Count, axis, self.max_categories)?;
            let series = ChartSeries::new(SeriesKind::Count, x_key, DEFAULT_VALUE_KEY, points);
            return Ok(Some(self.with_temporal_hint(series, chart_type, actual)));
        }

        if let Some(y) = y_key {
            let metric = match aggregation {
                Aggregation::Sum => Some((Metric::Sum, SeriesKind::Sum)),
                Aggregation::Avg => Some((Metric::Avg, SeriesKind::Avg)),
                _ => None,
            };
            if let Some((metric, kind)) = metric {
                let groups = group_rows(rows, x_key, Some(y), true);
                let points = aggregate(groups, metric, axis, self.max_categories)?;
                let series = ChartSeries::new(kind, x_key, y, points);
                return Ok(Some(self.with_temporal_hint(series, chart_type, actual)));
            }
        }

        if chart_type.is_bar_like() && (actual == ColumnType::Categorical || distinct < x_values.len()) {
            let (metric, kind) = match y_key {
                Some(_) => (Metric::Sum, SeriesKind::Sum),
                None => (Metric::Count, SeriesKind::Count),
            };
            let groups = group_rows(rows, x_key, y_key, false);
            let points = aggregate_implicit(groups, metric)?;
            let value_key = y_key.unwrap_or(DEFAULT_VALUE_KEY);
            return Ok(Some(ChartSeries::new(kind, x_key, value_key, points)));
        }

        let series = ChartSeries::new(
            SeriesKind::Raw,
            x_key,
            y_key.unwrap_or(DEFAULT_VALUE_KEY),
            self.raw_points(rows, x_key, y_key, actual),
        );
        Ok(Some(self.with_temporal_hint(series, chart_type, actual)))
    }

    /// Long temporal line/area series are drawn as scatter.
    fn with_temporal_hint(&self, mut series: ChartSeries, chart_type: ChartType, actual: ColumnType) -> ChartSeries {
        if matches!(chart_type, ChartType::Line | ChartType::Area)
            && actual == ColumnType::Temporal
            && series.len() > self.temporal_scatter_threshold
        {
            debug!(x_key = %series.x_key, points = series.len(), "Flagging temporal series for scatter rendering");
            series.force_scatter = true;
        }
        series
    }

    fn histogram(&self, x_values: &[&CellValue], x_key: &str) -> Result<Option<ChartSeries>> {
        let bins = create_histogram_data(x_values.iter().copied(), adaptive_bin_count(x_values.len()))?;
        if bins.is_empty() {
            return Ok(None);
        }
        let points = bins
            .into_iter()
            .map(|bin| SeriesPoint {
                x: AxisValue::Text(bin.label),
                value: bin.count as f64,
                original_index: None,
                bounds: Some((bin.lower_bound, bin.upper_bound)),
            })
            .collect();
        Ok(Some(ChartSeries::new(SeriesKind::Histogram, x_key, DEFAULT_VALUE_KEY, points)))
    }

    /// One point per row with a present x value.
    ///
    /// Without a y column, numeric axes plot x against itself, categorical
    /// axes get a seeded jitter in `[0.1, 0.9)` and temporal axes use the
    /// 1-based position.
    fn raw_points(
        &self,
        rows: &[Row],
        x_key: &str,
        y_key: Option<&str>,
        actual: ColumnType,
    ) -> Vec<SeriesPoint> {
        let mut points: Vec<SeriesPoint> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.get(x_key).is_missing())
            .enumerate()
            .map(|(position, (index, row))| {
                let x_cell = row.get(x_key);
                let x = match actual {
                    ColumnType::Numeric => AxisValue::Number(parse_number(x_cell).unwrap_or(0.0)),
                    _ => AxisValue::Text(x_cell.as_key().into_owned()),
                };
                let value = match (y_key, actual) {
                    (Some(y), _) => parse_number(row.get(y)).unwrap_or(0.0),
                    (None, ColumnType::Numeric) => parse_number(x_cell).unwrap_or(0.0),
                    (None, ColumnType::Categorical) => self.jitter(index),
                    (None, ColumnType::Temporal) => (position + 1) as f64,
                };
                SeriesPoint {
                    x,
                    value,
                    original_index: Some(index),
                    bounds: None,
                }
            })
            .collect();
        points.sort_by(|a, b| a.x.cmp_axis(&b.x));
        points
    }

    fn jitter(&self, index: usize) -> f64 {
        let mut rng = StdRng::seed_from_u64(self.jitter_seed.wrapping_add(index as u64));
        rng.gen_range(0.1..0.9)
    }
}

/// Derive chart data with default settings.
pub fn process_chart_data(rows: &[Row], columns: &[String], chart: &ChartSpecification) -> ChartOutcome {
    ChartDataProcessor::default().process_rows(rows, columns, chart)
}
