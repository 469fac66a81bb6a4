//! Prompt construction for insight generation and repair calls.
//!
//! Prompts are pure functions of the request so every provider sends the
//! same instructions and tests can assert on them without a network.

use crate::config::EngineConfig;
use crate::types::{InsightRequest, PlotGroup};

/// System message sent with every call.
pub const SYSTEM_PROMPT: &str = "You are a data storytelling assistant. You output strictly valid JSON only.";

fn schema_block(config: &EngineConfig) -> String {
    format!(
        r#"Return JSON with exactly this shape:
{{
  "insights": [{{"title": string, "content": string, "score"?: number}}],
  "plotGroups": [
    {{
      "groupTitle": string,
      "groupNarrative": string,
      "plots": [
        {{
          "type": "bar" | "line" | "area" | "scatter" | "pie" | "histogram",
          "spec": {{
            "xKey": string,
            "yKey": string | null,
            "aggregation": "none" | "count" | "sum" | "avg",
            "dataType": "numeric" | "categorical" | "temporal"
          }},
          "explanation": string
        }}
      ]
    }}
  ],
  "summaryMarkdown": string
}}

Rules:
- Provide {min_groups}-{max_groups} plotGroups, each with {min_plots}-{max_plots} plots.
- xKey and yKey must be exact column names from the list above.
- Use "sum" or "avg" only together with a numeric yKey.
- summaryMarkdown must be at least {min_chars} characters of plain prose, ending with a
  "Further exploration ideas" section written as a bulleted list."#,
        min_groups = config.min_plot_groups,
        max_groups = config.max_plot_groups,
        min_plots = config.min_plots_per_group,
        max_plots = config.max_plots_per_group,
        min_chars = config.min_summary_chars,
    )
}

fn dataset_block(request: &InsightRequest) -> String {
    let profile = serde_json::to_string_pretty(&request.profile).unwrap_or_default();
    let sample = serde_json::to_string_pretty(&request.sample_rows).unwrap_or_default();
    format!(
        "Dataset: {name}\nRows: {rows}\nColumns: {columns}\n\nColumn profile:\n{profile}\n\nSample rows ({sampled} of {rows}):\n{sample}",
        name = request.dataset_name,
        rows = request.row_count,
        columns = request.columns.join(", "),
        sampled = request.sample_rows.len(),
    )
}

/// Main prompt: describe the dataset and ask for the full payload.
pub fn build_insight_prompt(request: &InsightRequest, config: &EngineConfig) -> String {
    format!(
        "Analyze this CSV dataset and tell its story.\n\n{}\n\nProduce 4-6 concise insights (title plus 2-3 sentences each), \
        grouped chart suggestions and a long-form executive summary.\n\n{}",
        dataset_block(request),
        schema_block(config)
    )
}

/// Repair prompt: expand the plot groups that came back too few.
pub fn build_group_expansion_prompt(
    request: &InsightRequest,
    current: &[PlotGroup],
    config: &EngineConfig,
) -> String {
    let current_json = serde_json::to_string_pretty(current).unwrap_or_default();
    format!(
        "The previous answer contained only {count} valid plot groups. Expand them to {min}-{max} groups \
        covering different angles of the data. Keep the existing groups and add new ones.\n\n{dataset}\n\n\
        Current plotGroups:\n{current_json}\n\nReturn JSON of the form {{\"plotGroups\": [...]}} using the \
        plot group shape below.\n\n{schema}",
        count = current.len(),
        min = config.min_plot_groups,
        max = config.max_plot_groups,
        dataset = dataset_block(request),
        schema = schema_block(config),
    )
}

/// Repair prompt: lengthen a summary that came back too short.
pub fn build_summary_expansion_prompt(
    request: &InsightRequest,
    current_summary: &str,
    config: &EngineConfig,
) -> String {
    format!(
        "The executive summary below is too short. Rewrite it as at least {min_chars} characters of plain \
        prose covering the main patterns, notable segments, data quality caveats and recommendations, \
        then finish with a \"Further exploration ideas\" section as a bulleted list.\n\n{dataset}\n\n\
        Current summary:\n{current_summary}\n\nReturn JSON of the form {{\"summaryMarkdown\": string}}.",
        min_chars = config.min_summary_chars,
        dataset = dataset_block(request),
    )
}
