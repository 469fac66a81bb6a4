//! Validation and repair of model-written insight payloads.
//!
//! The model is asked for JSON with `insights`, `plotGroups` and
//! `summaryMarkdown`, but answers vary: commentary around the object,
//! renamed fields, unknown columns, too few groups, a thin summary.
//! [`InsightValidator`] turns any answer that parses into a payload with
//! the guaranteed shape:
//!
//! - at least one insight
//! - between the configured minimum and maximum number of plot groups,
//!   each with an allowed number of plots referencing real columns
//! - a plain-prose summary ending with an ideas section
//! - `charts` equal to the plot groups flattened in order
//!
//! Answers that do not parse, or parse without any expected section, are
//! errors. Group and summary shortfalls get one repair call each to the
//! provider, then rule-based content from [`fallback`].

pub mod extract;
pub mod fallback;
pub mod sanitize;

pub use extract::extract_json;
pub use fallback::{
    ColumnPositionStrategy, DEFAULT_IDEAS, DefaultGroupSynthesizer, GroupSynthesisStrategy,
    ProfileDrivenStrategy, default_summary, overview_insight,
};
pub use sanitize::{IDEAS_MARKER, SummarySections, split_summary, strip_markdown_emphasis};

use crate::ai::InsightProvider;
use crate::config::EngineConfig;
use crate::error::{InsightError, Result};
use crate::types::{
    Aggregation, ChartSpecification, ChartType, ColumnType, Insight, InsightPayload, InsightRequest,
    PlotGroup,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Top-level keys of which at least one must be present.
const EXPECTED_SECTIONS: [&str; 4] = ["plotGroups", "charts", "summaryMarkdown", "summary"];

/// Title of the group built from a legacy flat `charts` list.
const LEGACY_GROUP_TITLE: &str = "Suggested charts";

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Turns raw model output into an [`InsightPayload`].
pub struct InsightValidator {
    config: EngineConfig,
    synthesizer: DefaultGroupSynthesizer,
}

impl InsightValidator {
    pub fn new(config: EngineConfig) -> Self {
        let synthesizer = DefaultGroupSynthesizer::new(config.clone());
        Self { config, synthesizer }
    }

    /// Use a custom strategy chain for missing plot groups.
    pub fn with_synthesizer(mut self, synthesizer: DefaultGroupSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Validate `raw` against `request`, repairing shortfalls through
    /// `provider` when one is given.
    ///
    /// # Errors
    ///
    /// [`InsightError::MalformedResponse`] when no JSON object can be found,
    /// [`InsightError::IncompleteResponse`] when it has none of the expected
    /// sections. Failed repair calls are logged, never returned.
    pub fn validate(
        &self,
        raw: &str,
        request: &InsightRequest,
        provider: Option<&dyn InsightProvider>,
    ) -> Result<InsightPayload> {
        let value = extract_json(raw).ok_or_else(|| InsightError::malformed(raw))?;
        if !EXPECTED_SECTIONS
            .iter()
            .any(|key| value.get(*key).is_some_and(|v| !v.is_null()))
        {
            return Err(InsightError::incomplete(raw));
        }

        let insights = parse_insights(&value);

        let mut groups = self.parse_groups(&value, request);
        if groups.len() < self.config.min_plot_groups
            && let Some(provider) = provider
        {
            groups = self.expand_groups(provider, request, groups);
        }

        let mut summary = str_field(&value, &["summaryMarkdown", "summary"])
            .map(|s| strip_markdown_emphasis(s).trim().to_string())
            .unwrap_or_default();
        if !self.summary_is_long_enough(&summary) {
            summary = provider
                .and_then(|p| self.expand_summary(p, request, &summary))
                .unwrap_or_default();
        }

        self.assemble(insights, groups, summary, request)
    }

    /// Build a payload from rule-based content only.
    pub fn synthesize(&self, request: &InsightRequest) -> Result<InsightPayload> {
        self.assemble(Vec::new(), Vec::new(), String::new(), request)
    }

    fn assemble(
        &self,
        mut insights: Vec<Insight>,
        groups: Vec<PlotGroup>,
        summary: String,
        request: &InsightRequest,
    ) -> Result<InsightPayload> {
        let plot_groups = self.synthesizer.fill(groups, &request.profile)?;

        let summary_markdown = if self.summary_is_long_enough(&summary) {
            fallback::ensure_ideas_section(&summary)
        } else {
            debug!(chars = summary.chars().count(), "Using default summary");
            default_summary(&request.profile)
        };

        if insights.is_empty() {
            insights.push(overview_insight(&request.profile));
        }

        let charts = plot_groups.iter().flat_map(|g| g.plots.iter().cloned()).collect();

        Ok(InsightPayload {
            insights,
            plot_groups,
            charts,
            summary_markdown,
        })
    }

    fn summary_is_long_enough(&self, summary: &str) -> bool {
        summary.chars().count() >= self.config.min_summary_chars
    }

    // ------------------------------------------------------------------------
    // Repair calls
    // ------------------------------------------------------------------------

    fn expand_groups(
        &self,
        provider: &dyn InsightProvider,
        request: &InsightRequest,
        current: Vec<PlotGroup>,
    ) -> Vec<PlotGroup> {
        info!(
            provider = provider.name(),
            groups = current.len(),
            "Requesting more plot groups"
        );
        let text = match provider.expand_plot_groups(request, &current) {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Plot group expansion failed");
                return current;
            }
        };

        let Some(value) = extract_json(&text) else {
            warn!("Plot group expansion returned no JSON object");
            return current;
        };
        let expanded = self.parse_groups(&value, request);
        if expanded.len() > current.len() {
            expanded
        } else {
            debug!(expanded = expanded.len(), "Plot group expansion did not add groups");
            current
        }
    }

    fn expand_summary(
        &self,
        provider: &dyn InsightProvider,
        request: &InsightRequest,
        current: &str,
    ) -> Option<String> {
        info!(
            provider = provider.name(),
            chars = current.chars().count(),
            "Requesting a longer summary"
        );
        let text = provider
            .expand_summary(request, current)
            .map_err(|e| warn!(provider = provider.name(), error = %e, "Summary expansion failed"))
            .ok()?;

        let expanded = match extract_json(&text) {
            Some(value) => str_field(&value, &["summaryMarkdown", "summary"])?.to_string(),
            None => text,
        };
        let expanded = strip_markdown_emphasis(&expanded).trim().to_string();

        if self.summary_is_long_enough(&expanded) {
            Some(expanded)
        } else {
            warn!(chars = expanded.chars().count(), "Expanded summary is still too short");
            None
        }
    }

    // ------------------------------------------------------------------------
    // Lenient parsing
    // ------------------------------------------------------------------------

    fn parse_groups(&self, value: &Value, request: &InsightRequest) -> Vec<PlotGroup> {
        let mut groups: Vec<PlotGroup> = value
            .get("plotGroups")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| self.parse_group(item, i, request))
                    .collect()
            })
            .unwrap_or_default();

        if groups.is_empty()
            && let Some(charts) = value.get("charts").and_then(Value::as_array)
        {
            let plots = self.parse_plots(charts, request);
            if plots.len() >= self.config.min_plots_per_group {
                groups.push(PlotGroup {
                    group_title: LEGACY_GROUP_TITLE.to_string(),
                    group_narrative: String::new(),
                    plots,
                });
            }
        }

        groups
    }

    fn parse_group(&self, item: &Value, index: usize, request: &InsightRequest) -> Option<PlotGroup> {
        let plots = item
            .get("plots")
            .or_else(|| item.get("charts"))
            .and_then(Value::as_array)
            .map(|items| self.parse_plots(items, request))
            .unwrap_or_default();

        let group_title = str_field(item, &["groupTitle", "title"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("Analysis Subject {}", index + 1));

        if plots.len() < self.config.min_plots_per_group {
            debug!(group = %group_title, plots = plots.len(), "Dropping plot group with too few valid plots");
            return None;
        }

        Some(PlotGroup {
            group_title,
            group_narrative: str_field(item, &["groupNarrative", "narrative", "description"])
                .map(strip_markdown_emphasis)
                .unwrap_or_default(),
            plots,
        })
    }

    fn parse_plots(&self, items: &[Value], request: &InsightRequest) -> Vec<ChartSpecification> {
        let mut plots: Vec<ChartSpecification> =
            items.iter().filter_map(|item| parse_plot(item, request)).collect();
        plots.truncate(self.config.max_plots_per_group);
        plots
    }
}

/// Resolve `name` to a dataset column, exactly or ignoring case.
fn canonical_column(name: &str, request: &InsightRequest) -> Option<String> {
    let name = name.trim();
    request
        .columns
        .iter()
        .find(|c| c.as_str() == name)
        .or_else(|| request.columns.iter().find(|c| c.eq_ignore_ascii_case(name)))
        .cloned()
}

/// Parse one plot, accepting the axis fields either under `spec` or inline.
///
/// Plots with an unknown type or an x column that does not exist are
/// dropped; a missing type means a bar chart.
fn parse_plot(item: &Value, request: &InsightRequest) -> Option<ChartSpecification> {
    let chart_type = match item.get("type").and_then(Value::as_str) {
        Some(raw) => raw.parse::<ChartType>().ok()?,
        None => ChartType::Bar,
    };
    let spec = item.get("spec").filter(|s| s.is_object()).unwrap_or(item);

    let Some(x_key) = spec
        .get("xKey")
        .and_then(Value::as_str)
        .and_then(|x| canonical_column(x, request))
    else {
        debug!(plot = %item, "Dropping plot without a known xKey");
        return None;
    };
    let y_key = spec
        .get("yKey")
        .and_then(Value::as_str)
        .and_then(|y| canonical_column(y, request));

    let mut aggregation = spec
        .get("aggregation")
        .and_then(Value::as_str)
        .and_then(|a| a.parse::<Aggregation>().ok())
        .unwrap_or_default();
    if aggregation.needs_y() && y_key.is_none() {
        aggregation = Aggregation::Count;
    }

    let data_type = spec
        .get("dataType")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<ColumnType>().ok())
        .or_else(|| request.profile.column(&x_key).map(|c| c.column_type));

    let mut chart = ChartSpecification::new(chart_type, x_key).with_aggregation(aggregation);
    chart.spec.y_key = y_key;
    chart.spec.data_type = data_type;
    if let Some(explanation) = str_field(item, &["explanation", "description"]) {
        chart.explanation = strip_markdown_emphasis(explanation);
    }
    Some(chart)
}

fn parse_insights(value: &Value) -> Vec<Insight> {
    value
        .get("insights")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let title = str_field(item, &["title", "headline"]).unwrap_or("Insight");
                    let content = str_field(item, &["content", "description", "text"])?;
                    Some(Insight {
                        title: strip_markdown_emphasis(title),
                        content: strip_markdown_emphasis(content),
                        score: item.get("score").and_then(Value::as_f64),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
