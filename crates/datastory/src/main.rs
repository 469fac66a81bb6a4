//! CLI entry point for dataset storytelling.

use anyhow::{Result, anyhow};
use clap::Parser;
use datastory::profiler::DataProfiler;
use datastory::{
    ChartOutcome, ColumnProfile, DatasetProfile, EngineConfig, InsightPipeline, InsightReport,
    load_csv, plot_label, types::format_number,
};
use dotenv::dotenv;
use std::path::Path;
use tracing::{error, info};

#[cfg(feature = "ai")]
use datastory::ai::{API_KEY_ENV, OpenAiConfig, OpenAiProvider};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;
#[cfg(feature = "ai")]
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Profile a CSV and tell its story with charts",
    long_about = "Profiles a CSV dataset, asks an LLM for insights and grouped chart suggestions,\n\
                  validates the answer and derives chart data from a stored sample.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENAI_API_KEY    API key for OpenAI (required for LLM insights)\n\n\
                  EXAMPLES:\n  \
                  # Profile only, no LLM call\n  \
                  datastory -i sales.csv --profile-only\n\n  \
                  # Rule-based story with chart data\n  \
                  datastory -i sales.csv --no-ai --render\n\n  \
                  # Full report as JSON\n  \
                  datastory -i sales.csv --json | jq .payload.plotGroups"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Dataset name (defaults to the file name)
    #[arg(long)]
    name: Option<String>,

    /// Print the column profile and exit without generating insights
    #[arg(long)]
    profile_only: bool,

    /// Disable the LLM (rule-based insights only)
    #[arg(long, default_value = "false")]
    no_ai: bool,

    /// Model to request from the LLM provider
    #[arg(long)]
    model: Option<String>,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON.
    #[arg(long)]
    json: bool,

    /// Also derive chart data for every suggested plot
    #[arg(long)]
    render: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let mut dataset = load_csv(&args.input)?;
    if let Some(name) = &args.name {
        dataset.name = name.clone();
    }

    let config = EngineConfig::default();

    if args.profile_only {
        let profile = DataProfiler::new(&config).profile(&dataset);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        } else {
            print_profile(&dataset.name, &profile);
        }
        return Ok(());
    }

    let pipeline = build_pipeline(&args, config)?;
    let report = match pipeline.generate(&dataset) {
        Ok(report) => report,
        Err(e) => {
            error!("Insight generation failed: {}", e);
            return Err(anyhow!("Insight generation failed: {}", e));
        }
    };

    let rendered: Vec<ChartOutcome> = if args.render {
        report
            .payload
            .charts
            .iter()
            .map(|chart| pipeline.render(&report.dataset, chart))
            .collect()
    } else {
        Vec::new()
    };

    if args.json {
        let output = if args.render {
            serde_json::json!({ "report": report, "renderedCharts": rendered })
        } else {
            serde_json::to_value(&report)?
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_report(&report, &rendered);
    Ok(())
}

/// Build the pipeline with an LLM provider when one is available.
#[cfg(feature = "ai")]
fn build_pipeline(args: &Args, config: EngineConfig) -> Result<InsightPipeline> {
    if args.no_ai {
        info!("Running in rule-based mode (AI disabled)");
        return Ok(InsightPipeline::builder().config(config).build()?);
    }

    let api_key = env::var(API_KEY_ENV).unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!("{} not set. Falling back to rule-based insights.", API_KEY_ENV);
        return Ok(InsightPipeline::builder().config(config).build()?);
    }

    let mut provider_config = OpenAiConfig::builder();
    if let Some(model) = &args.model {
        provider_config = provider_config.model(model);
    }
    let provider_config = provider_config.build();
    info!(model = %provider_config.model, "Running with LLM insights (OpenAI)");

    let provider = OpenAiProvider::with_config(api_key, provider_config)?.with_engine_config(config.clone());

    Ok(InsightPipeline::builder()
        .config(config)
        .provider(Arc::new(provider))
        .build()?)
}

/// Build the pipeline without AI support (fallback when "ai" feature is disabled)
#[cfg(not(feature = "ai"))]
fn build_pipeline(args: &Args, config: EngineConfig) -> Result<InsightPipeline> {
    if !args.no_ai {
        tracing::warn!("AI support not compiled in. Using rule-based mode.");
        tracing::warn!("Compile with --features ai to enable AI support.");
    }
    info!("Running in rule-based mode");
    Ok(InsightPipeline::builder().config(config).build()?)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn column_details(column: &ColumnProfile) -> String {
    if let Some(stats) = &column.stats {
        return format!(
            "{} .. {} (median {})",
            format_number(stats.min),
            format_number(stats.max),
            format_number(stats.p50)
        );
    }
    if let Some(range) = &column.range {
        return format!("{} .. {}", range.start, range.end);
    }
    column
        .top_values
        .as_ref()
        .and_then(|top| top.first())
        .map(|top| format!("top: {} ({})", top.value, top.count))
        .unwrap_or_default()
}

/// Print the per-column profile table.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn print_profile(name: &str, profile: &DatasetProfile) {
    println!("\n{}", "=".repeat(80));
    println!("DATASET PROFILE: {}", name);
    println!("{}\n", "=".repeat(80));
    println!("  Rows: {}", profile.row_count);
    println!("  Columns: {}", profile.columns.len());
    println!();

    println!(
        "{:<20} {:<12} {:<10} {:<10} {:<30}",
        "Column", "Type", "Missing", "Distinct", "Details"
    );
    println!("{}", "-".repeat(80));

    for column in &profile.columns {
        println!(
            "{:<20} {:<12} {:<10} {:<10} {:<30}",
            truncate_str(&column.name, 19),
            column.column_type,
            column.missing_count,
            column.distinct_count,
            truncate_str(&column_details(column), 30)
        );
    }
    println!();
}

fn outcome_line(outcome: &ChartOutcome) -> String {
    match outcome {
        ChartOutcome::Ready(series) if series.force_scatter => {
            format!("{} points (scatter rendering)", series.len())
        }
        ChartOutcome::Ready(series) => format!("{} points", series.len()),
        ChartOutcome::InvalidConfig(e) => format!("configuration error: {}", e),
        ChartOutcome::ProcessingError(e) => format!("processing error: {}", e),
        ChartOutcome::NoData => "no data".to_string(),
    }
}

/// Print the human-readable report.
fn print_report(report: &InsightReport, rendered: &[ChartOutcome]) {
    println!("\n{}", "=".repeat(80));
    println!("DATA STORY: {}", report.dataset.name);
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  Rows: {}", report.dataset.row_count);
    println!("  Columns: {}", report.dataset.columns.join(", "));
    println!("  Stored sample: {} rows", report.dataset.sample_rows.len());
    println!();

    println!("INSIGHTS");
    println!("{}", "-".repeat(40));
    for insight in &report.payload.insights {
        println!("  - {}: {}", insight.title, insight.content);
    }
    println!();

    println!("PLOT GROUPS");
    println!("{}", "-".repeat(40));
    let mut chart_index = 0;
    for (g, group) in report.payload.plot_groups.iter().enumerate() {
        println!("  {}. {}", g + 1, group.group_title);
        if !group.group_narrative.is_empty() {
            println!("     {}", group.group_narrative);
        }
        for (i, plot) in group.plots.iter().enumerate() {
            match rendered.get(chart_index) {
                Some(outcome) => println!(
                    "     - [{}] {}: {}",
                    plot.chart_type,
                    plot_label(plot, i),
                    outcome_line(outcome)
                ),
                None => println!("     - [{}] {}", plot.chart_type, plot_label(plot, i)),
            }
            chart_index += 1;
        }
    }
    println!();

    let sections = report.summary_sections();
    println!("SUMMARY");
    println!("{}", "-".repeat(40));
    println!("{}", sections.summary);
    println!();

    if !sections.ideas.is_empty() {
        println!("FURTHER EXPLORATION IDEAS");
        println!("{}", "-".repeat(40));
        for idea in &sections.ideas {
            println!("  - {}", idea);
        }
        println!();
    }
}
