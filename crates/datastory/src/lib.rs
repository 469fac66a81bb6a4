//! Dataset Storytelling Library
//!
//! Turns an uploaded CSV into the data behind an insight dashboard: a
//! column profile, chart series ready for a rendering layer, and an
//! LLM-written story validated into a guaranteed shape.
//!
//! # Overview
//!
//! - **Ingestion**: CSV loading through Polars with header validation
//! - **Profiling**: Type inference, missing/distinct counts, quartiles,
//!   date ranges and top values
//! - **Chart Data**: Count/sum/avg aggregation with "Other" capping,
//!   adaptive histograms and raw point series
//! - **Insight Validation**: Lenient parsing of model output with one-shot
//!   repair calls and rule-based fallbacks
//! - **Rule-Based Mode**: Works without an LLM using profile-driven groups
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use datastory::{ChartOutcome, InsightPipeline, load_csv};
//! use datastory::ai::OpenAiProvider;
//! use std::sync::Arc;
//!
//! let dataset = load_csv("sales.csv")?;
//!
//! // Option 1: With an LLM provider (reads OPENAI_API_KEY)
//! let pipeline = InsightPipeline::builder()
//!     .provider(Arc::new(OpenAiProvider::from_env()?))
//!     .build()?;
//!
//! // Option 2: Rule-based only
//! let pipeline = InsightPipeline::builder().build()?;
//!
//! let report = pipeline.generate(&dataset)?;
//! for group in &report.payload.plot_groups {
//!     println!("{}", group.group_title);
//!     for chart in &group.plots {
//!         match pipeline.render(&report.dataset, chart) {
//!             ChartOutcome::Ready(series) => println!("  {} points", series.len()),
//!             other => println!("  {}", other.status()),
//!         }
//!     }
//! }
//! ```
//!
//! # Chart Data Without a Pipeline
//!
//! ```rust,ignore
//! use datastory::{Aggregation, ChartSpecification, ChartType, process_chart_data};
//!
//! let chart = ChartSpecification::new(ChartType::Bar, "region")
//!     .with_y("revenue")
//!     .with_aggregation(Aggregation::Sum);
//! let outcome = process_chart_data(&dataset.rows, &dataset.columns, &chart);
//! ```
//!
//! # Configuration
//!
//! Use [`EngineConfig`] to tune sample sizes, inference windows and the
//! payload bounds:
//!
//! ```rust,ignore
//! use datastory::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .storage_sample_size(1000)   // Rows kept for chart rendering
//!     .prompt_sample_size(60)      // Rows shown to the model
//!     .max_categories(20)          // Categories before "Other"
//!     .plot_groups(4, 5)
//!     .min_summary_chars(900)
//!     .build()?;
//! ```

pub mod ai;
pub mod charts;
pub mod config;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod pipeline;
pub mod profiler;
pub mod sampling;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{
    AxisValue, ChartConfigError, ChartDataProcessor, ChartOutcome, ChartSeries, HistogramBin,
    SeriesKind, SeriesPoint, chart_title, create_histogram_data, plot_label, process_chart_data,
};
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder};
pub use error::{InsightError, Result as InsightResult, ResultExt};
pub use ingest::{load_csv, load_csv_from_str, validate_header};
pub use insights::{InsightValidator, SummarySections, extract_json, split_summary, strip_markdown_emphasis};
pub use pipeline::{InsightPipeline, InsightPipelineBuilder, InsightReport, StoredDataset};
pub use profiler::{DataProfiler, build_profile, infer_column_type};
pub use sampling::downsample_evenly;
pub use types::{
    Aggregation, CellValue, ChartSpec, ChartSpecification, ChartType, ColumnProfile, ColumnType,
    Dataset, DatasetProfile, Insight, InsightPayload, InsightRequest, PlotGroup, Row,
};
pub use utils::{is_date_like, parse_date, parse_number, parse_numeric_string};
