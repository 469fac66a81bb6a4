use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Cells, rows and datasets
// ============================================================================

/// Format used when a [`CellValue::Date`] has to be turned back into text.
pub const CELL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A single cell, resolved once at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Build a cell from raw CSV text. Empty strings become [`CellValue::Null`].
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// Null or empty text.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// String form used for all string-keyed equality (`5` and `"5"` collide).
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Date(d) => Cow::Owned(d.format(CELL_DATE_FORMAT).to_string()),
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
            serde_json::Value::String(s) => CellValue::from_raw(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// Render a number the way it is keyed and displayed (`5.0` -> `"5"`).
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_raw(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<Option<&str>> for CellValue {
    fn from(s: Option<&str>) -> Self {
        s.map_or(CellValue::Null, CellValue::from_raw)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            CellValue::Number(_) => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Date(_) => serializer.serialize_str(&self.as_key()),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(CellValue::from_json(&value))
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// One record: column name -> cell, in source column order.
///
/// Columns absent from the record read as [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty row with room for `columns` cells.
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            cells: IndexMap::with_capacity(columns),
        }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Set a cell, replacing any previous value for the column in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cells.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = IndexMap::<String, CellValue>::deserialize(deserializer)?;
        Ok(Row { cells })
    }
}

/// A parsed upload: ordered column names plus ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// All cells of one column, nulls included, in row order.
    pub fn column_values(&self, column: &str) -> Vec<CellValue> {
        column_values(&self.rows, column)
    }
}

/// All cells of one column across `rows`, nulls included, in row order.
pub fn column_values(rows: &[Row], column: &str) -> Vec<CellValue> {
    rows.iter().map(|row| row.get(column).clone()).collect()
}

// ============================================================================
// Column profiles
// ============================================================================

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Temporal,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Temporal => "temporal",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "quantitative" => Ok(ColumnType::Numeric),
            "categorical" | "category" | "nominal" | "ordinal" => Ok(ColumnType::Categorical),
            "temporal" | "date" | "datetime" | "time" => Ok(ColumnType::Temporal),
            other => Err(format!("unknown data type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
    pub mean: f64,
}

/// ISO-8601 bounds of a temporal column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub missing_count: usize,
    pub distinct_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stats: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_values: Option<Vec<TopValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProfile {
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the columns of one type, in column order.
    pub fn columns_of_type(&self, column_type: ColumnType) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type == column_type)
            .map(|c| c.name.as_str())
            .collect()
    }
}

// ============================================================================
// Chart specifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Scatter,
    Pie,
    Histogram,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Histogram => "histogram",
        }
    }

    /// Bar-like charts get implicit aggregation and numeric auto-binning.
    pub fn is_bar_like(&self) -> bool {
        matches!(self, ChartType::Bar | ChartType::Histogram)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" | "column" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "area" => Ok(ChartType::Area),
            "scatter" => Ok(ChartType::Scatter),
            "pie" | "donut" => Ok(ChartType::Pie),
            "histogram" => Ok(ChartType::Histogram),
            other => Err(format!("unknown chart type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    None,
    Count,
    Sum,
    Avg,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::None => "none",
            Aggregation::Count => "count",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
        }
    }

    /// Sum and avg need a y column.
    pub fn needs_y(&self) -> bool {
        matches!(self, Aggregation::Sum | Aggregation::Avg)
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "raw" => Ok(Aggregation::None),
            "count" => Ok(Aggregation::Count),
            "sum" | "total" => Ok(Aggregation::Sum),
            "avg" | "average" | "mean" => Ok(Aggregation::Avg),
            other => Err(format!("unknown aggregation '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub x_key: String,
    #[serde(default)]
    pub y_key: Option<String>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub data_type: Option<ColumnType>,
}

/// A persisted chart: type, axis spec and a short explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpecification {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub spec: ChartSpec,
    #[serde(default)]
    pub explanation: String,
}

impl ChartSpecification {
    pub fn new(chart_type: ChartType, x_key: impl Into<String>) -> Self {
        Self {
            chart_type,
            spec: ChartSpec {
                x_key: x_key.into(),
                y_key: None,
                aggregation: Aggregation::None,
                data_type: None,
            },
            explanation: String::new(),
        }
    }

    pub fn with_y(mut self, y_key: impl Into<String>) -> Self {
        self.spec.y_key = Some(y_key.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.spec.aggregation = aggregation;
        self
    }

    pub fn with_data_type(mut self, data_type: ColumnType) -> Self {
        self.spec.data_type = Some(data_type);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// The y column, ignoring blank names.
    pub fn y_key(&self) -> Option<&str> {
        self.spec.y_key.as_deref().filter(|y| !y.is_empty())
    }
}

// ============================================================================
// Insight payload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotGroup {
    pub group_title: String,
    #[serde(default)]
    pub group_narrative: String,
    pub plots: Vec<ChartSpecification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<f64>,
}

/// Validated LLM output, ready to be persisted as insight/chart/report records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightPayload {
    pub insights: Vec<Insight>,
    pub plot_groups: Vec<PlotGroup>,
    /// `plot_groups` flattened in order, for persistence as chart records.
    pub charts: Vec<ChartSpecification>,
    pub summary_markdown: String,
}

/// Everything the LLM collaborator needs to describe a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub dataset_name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub profile: DatasetProfile,
    pub sample_rows: Vec<Row>,
}
