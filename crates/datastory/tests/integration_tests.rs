//! Integration tests for the insight pipeline.
//!
//! These tests verify end-to-end behavior from CSV loading through chart
//! rendering, with scripted providers standing in for the LLM.

use anyhow::anyhow;
use datastory::ai::InsightProvider;
use datastory::{
    Aggregation, CellValue, ChartOutcome, ChartSpecification, ChartType, ColumnType, Dataset,
    EngineConfig, InsightError, InsightPipeline, InsightRequest, PlotGroup, Row, load_csv,
    process_chart_data,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> Dataset {
    load_csv(fixtures_path().join(filename)).expect("Failed to load fixture")
}

fn plot(chart_type: &str, x: &str, y: Option<&str>, aggregation: &str) -> serde_json::Value {
    serde_json::json!({
        "type": chart_type,
        "spec": {"xKey": x, "yKey": y, "aggregation": aggregation},
        "explanation": format!("{} of {}", aggregation, x)
    })
}

fn group(title: &str) -> serde_json::Value {
    serde_json::json!({
        "groupTitle": title,
        "groupNarrative": format!("Narrative for {}", title),
        "plots": [
            plot("bar", "region", Some("revenue"), "sum"),
            plot("histogram", "units", None, "none"),
            plot("line", "date", Some("revenue"), "avg")
        ]
    })
}

fn long_summary() -> String {
    let body = "Revenue is concentrated in a few regions and grows steadily through the year. ".repeat(14);
    format!("## Executive Summary\n**{}**\n\nFurther exploration ideas\n- Split revenue by product\n- Compare 2023 with 2024", body)
}

/// Provider that replays fixed answers and counts calls.
struct MockProvider {
    answer: String,
    expansion: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            expansion: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_expansion(mut self, expansion: impl Into<String>) -> Self {
        self.expansion = Some(expansion.into());
        self
    }
}

impl InsightProvider for MockProvider {
    fn generate_insights(&self, request: &InsightRequest) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(request.sample_rows.len() <= 60);
        Ok(self.answer.clone())
    }

    fn expand_plot_groups(&self, _request: &InsightRequest, _current: &[PlotGroup]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.expansion.clone().ok_or_else(|| anyhow!("no expansion scripted"))
    }

    fn expand_summary(&self, _request: &InsightRequest, _current: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("no summary scripted"))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> Option<&str> {
        Some("mock-1")
    }
}

fn pipeline_with(provider: Arc<MockProvider>) -> InsightPipeline {
    InsightPipeline::builder()
        .provider(provider)
        .build()
        .expect("Failed to build pipeline")
}

// ============================================================================
// Loading and Profiling
// ============================================================================

#[test]
fn test_load_sales_fixture() {
    let dataset = load_fixture("sales.csv");
    assert_eq!(dataset.name, "sales");
    assert_eq!(dataset.row_count(), 36);
    assert_eq!(
        dataset.columns,
        vec!["date", "region", "product", "revenue", "units", "notes"]
    );
    assert_eq!(dataset.rows[0].get("revenue"), &CellValue::Text("$50".to_string()));
}

#[test]
fn test_invalid_headers_are_rejected() {
    let err = load_csv(fixtures_path().join("headerless.csv")).unwrap_err();
    assert!(matches!(err, InsightError::InvalidHeader(_)));

    let err = load_csv(fixtures_path().join("duplicate_header.csv")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("blank column name(s)"), "{}", message);
    assert!(message.contains("duplicate column name(s): name"), "{}", message);
}

#[test]
fn test_profile_of_sales_fixture() {
    let pipeline = InsightPipeline::builder().build().unwrap();
    let (stored, request) = pipeline.prepare(&load_fixture("sales.csv"));

    assert_eq!(stored.row_count, 36);
    assert_eq!(stored.sample_rows.len(), 36);

    let profile = &request.profile;
    let type_of = |name: &str| profile.column(name).map(|c| c.column_type);
    assert_eq!(type_of("date"), Some(ColumnType::Temporal));
    assert_eq!(type_of("region"), Some(ColumnType::Categorical));
    assert_eq!(type_of("revenue"), Some(ColumnType::Numeric));
    assert_eq!(type_of("units"), Some(ColumnType::Numeric));

    let revenue = profile.column("revenue").unwrap();
    assert_eq!(revenue.missing_count, 1);
    assert!(revenue.stats.is_some());

    let notes = profile.column("notes").unwrap();
    assert_eq!(notes.missing_count, 27);

    let date = profile.column("date").unwrap();
    let range = date.range.as_ref().unwrap();
    assert!(range.start.starts_with("2023-01-01"));
    assert!(range.end.starts_with("2025-12-"));
}

// ============================================================================
// Chart Data
// ============================================================================

#[test]
fn test_count_by_region_conserves_rows() {
    let dataset = load_fixture("sales.csv");
    let chart = ChartSpecification::new(ChartType::Bar, "region").with_aggregation(Aggregation::Count);

    let outcome = process_chart_data(&dataset.rows, &dataset.columns, &chart);
    let series = outcome.series().expect("count chart should render");
    let total: f64 = series.points.iter().map(|p| p.value).sum();
    assert_eq!(total, 35.0);
    assert_eq!(series.points.len(), 4);
}

#[test]
fn test_histogram_conserves_values() {
    let dataset = load_fixture("sales.csv");
    let chart = ChartSpecification::new(ChartType::Histogram, "units");

    let outcome = process_chart_data(&dataset.rows, &dataset.columns, &chart);
    let series = outcome.series().expect("histogram should render");
    let total: f64 = series.points.iter().map(|p| p.value).sum();
    assert_eq!(total, 36.0);
}

#[test]
fn test_category_capping_end_to_end() {
    let mut rows = Vec::new();
    for (i, count) in (1..=25).rev().enumerate() {
        for _ in 0..count {
            rows.push(Row::from_pairs([("category", format!("cat{:02}", i))]));
        }
    }
    let dataset = Dataset::new("capped", vec!["category".to_string()], rows);
    let chart = ChartSpecification::new(ChartType::Bar, "category").with_aggregation(Aggregation::Count);

    let outcome = process_chart_data(&dataset.rows, &dataset.columns, &chart);
    let series = outcome.series().unwrap();
    assert_eq!(series.points.len(), 21);
    let other = series.points.iter().find(|p| p.x.to_string() == "Other").unwrap();
    assert_eq!(other.value, 15.0);
    assert!(series.points.windows(2).all(|w| w[0].value >= w[1].value));
}

#[test]
fn test_invalid_and_empty_charts_are_distinguished() {
    let dataset = load_fixture("sales.csv");

    let missing_x = ChartSpecification::new(ChartType::Bar, "");
    assert!(matches!(
        process_chart_data(&dataset.rows, &dataset.columns, &missing_x),
        ChartOutcome::InvalidConfig(_)
    ));

    let unknown = ChartSpecification::new(ChartType::Bar, "profit");
    assert_eq!(process_chart_data(&dataset.rows, &dataset.columns, &unknown).status(), "invalid_config");

    let empty = Dataset::new("empty", vec!["units".to_string()], Vec::new());
    let hist = ChartSpecification::new(ChartType::Histogram, "units");
    assert_eq!(process_chart_data(&empty.rows, &empty.columns, &hist), ChartOutcome::NoData);
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_rule_based_pipeline_on_fixture() {
    let pipeline = InsightPipeline::builder().build().unwrap();
    let report = pipeline.generate(&load_fixture("sales.csv")).unwrap();
    let payload = &report.payload;

    assert!((4..=5).contains(&payload.plot_groups.len()));
    assert!(!payload.insights.is_empty());
    let flattened: Vec<&ChartSpecification> = payload.plot_groups.iter().flat_map(|g| &g.plots).collect();
    assert_eq!(payload.charts.iter().collect::<Vec<_>>(), flattened);

    for chart in &payload.charts {
        assert!(report.dataset.columns.contains(&chart.spec.x_key));
        let outcome = pipeline.render(&report.dataset, chart);
        assert!(
            !matches!(outcome, ChartOutcome::InvalidConfig(_) | ChartOutcome::ProcessingError(_)),
            "{:?} -> {:?}",
            chart,
            outcome
        );
    }

    let sections = report.summary_sections();
    assert!(sections.summary.contains("36 rows"));
    assert_eq!(sections.ideas.len(), 3);
}

#[test]
fn test_rule_based_trend_lines_keep_every_date() {
    let regions = ["North", "South", "East"];
    let rows: Vec<Row> = (1..=40)
        .map(|i| {
            let month = if i <= 31 { 1 } else { 2 };
            let day = if i <= 31 { i } else { i - 31 };
            Row::from_pairs([
                ("date", format!("2021-{month:02}-{day:02}")),
                ("region", regions[i % 3].to_string()),
                ("sales", (i * 3 % 17).to_string()),
            ])
        })
        .collect();
    let columns = vec!["date".to_string(), "region".to_string(), "sales".to_string()];
    let dataset = Dataset::new("daily", columns, rows);

    let pipeline = InsightPipeline::builder().build().unwrap();
    let report = pipeline.generate(&dataset).unwrap();

    let lines: Vec<&ChartSpecification> = report
        .payload
        .charts
        .iter()
        .filter(|c| c.chart_type == ChartType::Line && c.spec.x_key == "date")
        .collect();
    assert!(!lines.is_empty());

    for chart in lines {
        let outcome = pipeline.render(&report.dataset, chart);
        let series = outcome.series().expect("trend line should render");
        assert_eq!(series.len(), 40, "{:?}", chart);
        assert!(series.points.iter().all(|p| p.x.to_string() != "Other"));
        assert_eq!(series.points[0].x.to_string(), "2021-01-01");
        assert_eq!(series.points[39].x.to_string(), "2021-02-09");
        assert!(series.force_scatter);
    }
}

#[test]
fn test_llm_answer_is_validated() {
    let answer = serde_json::json!({
        "insights": [{"title": "Regional skew", "content": "The *North* leads revenue."}],
        "plotGroups": [group("Revenue"), group("Volume"), group("Seasonality"), group("Products")],
        "summaryMarkdown": long_summary()
    });
    let provider = Arc::new(MockProvider::new(format!("```json\n{}\n```", answer)));
    let report = pipeline_with(provider.clone())
        .generate(&load_fixture("sales.csv"))
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.payload.insights[0].content, "The North leads revenue.");
    assert_eq!(report.payload.plot_groups.len(), 4);
    assert_eq!(report.payload.charts.len(), 12);
    assert_eq!(report.payload.charts[0].spec.data_type, Some(ColumnType::Categorical));

    let sections = report.summary_sections();
    assert!(!sections.summary.contains("**"));
    assert!(!sections.summary.starts_with("Executive Summary"));
    assert_eq!(sections.ideas, vec!["Split revenue by product", "Compare 2023 with 2024"]);
}

#[test]
fn test_short_answer_is_repaired() {
    let answer = serde_json::json!({
        "plotGroups": [group("Revenue"), group("Volume")],
        "summary": "Too short."
    });
    let expansion = serde_json::json!({
        "plotGroups": [group("Revenue"), group("Volume"), group("Seasonality"), group("Products"), group("Mix")]
    });
    let provider = Arc::new(MockProvider::new(answer.to_string()).with_expansion(expansion.to_string()));
    let dataset = load_fixture("sales.csv");
    let report = pipeline_with(provider.clone()).generate(&dataset).unwrap();

    // initial call, group expansion, summary expansion
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.payload.plot_groups.len(), 5);
    assert_eq!(report.payload.plot_groups[4].group_title, "Mix");
    assert!(report.payload.summary_markdown.starts_with("This dataset contains 36 rows"));
}

#[test]
fn test_unrepaired_groups_are_synthesized() {
    let answer = serde_json::json!({
        "plotGroups": [group("Revenue"), {"groupTitle": "Broken", "plots": [plot("radar", "ghost", None, "none")]}],
        "summaryMarkdown": long_summary()
    });
    let provider = Arc::new(MockProvider::new(answer.to_string()));
    let dataset = load_fixture("sales.csv");
    let report = pipeline_with(provider).generate(&dataset).unwrap();

    let groups = &report.payload.plot_groups;
    assert!((4..=5).contains(&groups.len()));
    assert_eq!(groups[0].group_title, "Revenue");
    assert!(groups.iter().all(|g| g.group_title != "Broken"));
    for chart in &report.payload.charts {
        assert!(dataset.columns.contains(&chart.spec.x_key));
    }
}

#[test]
fn test_malformed_answer_is_an_error() {
    let provider = Arc::new(MockProvider::new("I could not analyze this dataset."));
    let err = pipeline_with(provider)
        .generate(&load_fixture("sales.csv"))
        .unwrap_err();
    assert!(matches!(err, InsightError::MalformedResponse { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_report_serializes_camel_case() {
    let config = EngineConfig::builder().storage_sample_size(10).build().unwrap();
    let pipeline = InsightPipeline::builder().config(config).build().unwrap();
    let report = pipeline.generate(&load_fixture("sales.csv")).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["dataset"]["rowCount"], 36);
    assert_eq!(json["dataset"]["sampleRows"].as_array().unwrap().len(), 10);
    assert!(json["payload"]["plotGroups"].is_array());
    assert!(json["payload"]["summaryMarkdown"].is_string());
    assert_eq!(json["profile"]["columns"][0]["type"], "temporal");
}
