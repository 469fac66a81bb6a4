//! Rule-based content used when the model's answer is insufficient or when
//! no model is configured.
//!
//! Plot groups are synthesized by an ordered chain of strategies. The first
//! reads the column profile and builds analysis-shaped groups; the second
//! only needs column positions and always produces something for a dataset
//! with at least one column.

use crate::config::EngineConfig;
use crate::error::{InsightError, Result};
use crate::types::{
    Aggregation, ChartSpecification, ChartType, ColumnProfile, ColumnType, DatasetProfile, Insight,
    PlotGroup,
};
use std::collections::HashSet;
use tracing::debug;

use super::sanitize::IDEAS_MARKER;

/// Columns of each type considered by the profile-driven strategy.
const FOCUS_COLUMNS: usize = 3;

/// Columns covered by the overview group.
const OVERVIEW_COLUMNS: usize = 4;

/// Follow-up ideas appended to summaries that lack their own.
pub const DEFAULT_IDEAS: [&str; 3] = [
    "Consider segmenting by categories to find the groups that drive the totals.",
    "Compare time periods to separate trends from one-off spikes.",
    "Enrich the data with external benchmarks to judge what good looks like.",
];

/// A way of producing candidate plot groups from a profile.
///
/// Candidates are not deduplicated or capped; [`DefaultGroupSynthesizer`]
/// does that when merging them.
pub trait GroupSynthesisStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn synthesize(&self, profile: &DatasetProfile, config: &EngineConfig) -> Vec<PlotGroup>;
}

// ============================================================================
// Plot builders
// ============================================================================

fn histogram(column: &str) -> ChartSpecification {
    ChartSpecification::new(ChartType::Histogram, column)
        .with_data_type(ColumnType::Numeric)
        .with_explanation(format!("How values of {column} are distributed."))
}

fn count_chart(chart_type: ChartType, column: &str, data_type: ColumnType) -> ChartSpecification {
    ChartSpecification::new(chart_type, column)
        .with_aggregation(Aggregation::Count)
        .with_data_type(data_type)
        .with_explanation(format!("Number of records for each value of {column}."))
}

fn trend_line(time: &str, value: &str) -> ChartSpecification {
    ChartSpecification::new(ChartType::Line, time)
        .with_y(value)
        .with_aggregation(Aggregation::Avg)
        .with_data_type(ColumnType::Temporal)
        .with_explanation(format!("Average {value} over {time}."))
}

fn scatter(x: &str, y: &str) -> ChartSpecification {
    ChartSpecification::new(ChartType::Scatter, x)
        .with_y(y)
        .with_data_type(ColumnType::Numeric)
        .with_explanation(format!("Relationship between {x} and {y}."))
}

fn segment_bar(category: &str, value: &str) -> ChartSpecification {
    ChartSpecification::new(ChartType::Bar, category)
        .with_y(value)
        .with_aggregation(Aggregation::Avg)
        .with_data_type(ColumnType::Categorical)
        .with_explanation(format!("Average {value} for each {category}."))
}

/// The most natural single chart for a column.
fn primary_plot(column: &ColumnProfile) -> ChartSpecification {
    match column.column_type {
        ColumnType::Numeric => histogram(&column.name),
        ColumnType::Categorical => count_chart(ChartType::Bar, &column.name, ColumnType::Categorical),
        ColumnType::Temporal => count_chart(ChartType::Line, &column.name, ColumnType::Temporal),
    }
}

/// A second view of a column, different from [`primary_plot`].
fn secondary_plot(column: &ColumnProfile) -> ChartSpecification {
    match column.column_type {
        ColumnType::Numeric => count_chart(ChartType::Bar, &column.name, ColumnType::Numeric),
        ColumnType::Categorical => count_chart(ChartType::Pie, &column.name, ColumnType::Categorical),
        ColumnType::Temporal => count_chart(ChartType::Bar, &column.name, ColumnType::Temporal),
    }
}

/// Bring `plots` within the per-group bounds.
///
/// Short groups are topped up with single-column views from the rest of the
/// profile. Views no earlier group has shown come first, preferring columns
/// the group does not already plot; only when every view is taken are
/// existing plots repeated. Every plot kept is recorded in `used`.
fn fit_plots(
    mut plots: Vec<ChartSpecification>,
    profile: &DatasetProfile,
    config: &EngineConfig,
    used: &mut Vec<ChartSpecification>,
) -> Vec<ChartSpecification> {
    if plots.len() < config.min_plots_per_group {
        let covered: HashSet<String> = plots.iter().map(|p| p.spec.x_key.clone()).collect();
        let companions: Vec<ChartSpecification> = profile
            .columns
            .iter()
            .flat_map(|c| [primary_plot(c), secondary_plot(c)])
            .filter(|plot| !plots.contains(plot))
            .collect();
        let rank = |plot: &ChartSpecification| match (used.contains(plot), covered.contains(&plot.spec.x_key)) {
            (false, false) => 0,
            (false, true) => 1,
            (true, _) => 2,
        };
        let mut ranked: Vec<(usize, ChartSpecification)> =
            companions.into_iter().map(|plot| (rank(&plot), plot)).collect();
        // stable: profile order within a rank
        ranked.sort_by_key(|(rank, _)| *rank);

        for (_, plot) in ranked {
            if plots.len() >= config.min_plots_per_group {
                break;
            }
            plots.push(plot);
        }

        let mut i = 0;
        while !plots.is_empty() && plots.len() < config.min_plots_per_group {
            plots.push(plots[i].clone());
            i += 1;
        }
    }
    plots.truncate(config.max_plots_per_group);
    used.extend(plots.iter().cloned());
    plots
}

fn list(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Analysis-shaped groups from the column profile: distributions, category
/// counts, time trends, numeric relationships and segment comparisons.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileDrivenStrategy;

impl GroupSynthesisStrategy for ProfileDrivenStrategy {
    fn name(&self) -> &'static str {
        "profile-driven"
    }

    fn synthesize(&self, profile: &DatasetProfile, config: &EngineConfig) -> Vec<PlotGroup> {
        let take = |t: ColumnType| -> Vec<&str> {
            profile.columns_of_type(t).into_iter().take(FOCUS_COLUMNS).collect()
        };
        let numeric = take(ColumnType::Numeric);
        let categorical = take(ColumnType::Categorical);
        let temporal = take(ColumnType::Temporal);

        let mut groups = Vec::new();
        let mut used = Vec::new();
        let mut push = |title: &str, narrative: String, plots: Vec<ChartSpecification>| {
            groups.push(PlotGroup {
                group_title: title.to_string(),
                group_narrative: narrative,
                plots: fit_plots(plots, profile, config, &mut used),
            });
        };

        if !numeric.is_empty() {
            push(
                "Distribution of key measures",
                format!("Histograms show the spread, skew and outliers of {}.", list(&numeric)),
                numeric.iter().map(|c| histogram(c)).collect(),
            );
        }

        if !categorical.is_empty() {
            push(
                "Category breakdown",
                format!("How records are split across {}.", list(&categorical)),
                categorical
                    .iter()
                    .map(|c| count_chart(ChartType::Bar, c, ColumnType::Categorical))
                    .collect(),
            );
        }

        if let (Some(time), false) = (temporal.first(), numeric.is_empty()) {
            push(
                "Trends over time",
                format!("How {} moved across {}.", list(&numeric), time),
                numeric.iter().map(|value| trend_line(time, value)).collect(),
            );
        }

        if numeric.len() >= 2 {
            let mut pairs = Vec::new();
            for (i, x) in numeric.iter().enumerate() {
                for y in &numeric[i + 1..] {
                    pairs.push(scatter(x, y));
                }
            }
            push(
                "Relationships between measures",
                format!("Scatter plots reveal whether {} move together.", list(&numeric)),
                pairs,
            );
        }

        if let (Some(category), false) = (categorical.first(), numeric.is_empty()) {
            push(
                "Segment comparison",
                format!("Average {} for each {}.", list(&numeric), category),
                numeric.iter().map(|value| segment_bar(category, value)).collect(),
            );
        }

        groups
    }
}

/// Groups built from column order alone: an overview of the first columns
/// followed by one focus group per column, cycling until enough exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnPositionStrategy;

impl GroupSynthesisStrategy for ColumnPositionStrategy {
    fn name(&self) -> &'static str {
        "column-position"
    }

    fn synthesize(&self, profile: &DatasetProfile, config: &EngineConfig) -> Vec<PlotGroup> {
        if profile.columns.is_empty() {
            return Vec::new();
        }

        let overview: Vec<&ColumnProfile> = profile.columns.iter().take(OVERVIEW_COLUMNS).collect();
        let names: Vec<&str> = overview.iter().map(|c| c.name.as_str()).collect();
        let mut used = Vec::new();
        let mut groups = vec![PlotGroup {
            group_title: "Overview of key columns".to_string(),
            group_narrative: format!("A first look at {}.", list(&names)),
            plots: fit_plots(overview.iter().map(|c| primary_plot(c)).collect(), profile, config, &mut used),
        }];

        let mut pass = 0;
        while groups.len() < config.max_plot_groups {
            for column in &profile.columns {
                if groups.len() >= config.max_plot_groups {
                    break;
                }
                let group_title = match pass {
                    0 => format!("Closer look at {}", column.name),
                    n => format!("Closer look at {} ({})", column.name, n + 1),
                };
                groups.push(PlotGroup {
                    group_title,
                    group_narrative: format!("Values and frequencies of {}.", column.name),
                    plots: fit_plots(
                        vec![primary_plot(column), secondary_plot(column)],
                        profile,
                        config,
                        &mut used,
                    ),
                });
            }
            pass += 1;
        }

        groups
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Tops up plot groups by running strategies in order.
pub struct DefaultGroupSynthesizer {
    config: EngineConfig,
    strategies: Vec<Box<dyn GroupSynthesisStrategy>>,
}

impl DefaultGroupSynthesizer {
    /// Profile-driven groups first, column-position groups after.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_strategies(
            config,
            vec![Box::new(ProfileDrivenStrategy), Box::new(ColumnPositionStrategy)],
        )
    }

    pub fn with_strategies(config: EngineConfig, strategies: Vec<Box<dyn GroupSynthesisStrategy>>) -> Self {
        Self { config, strategies }
    }

    /// Return `existing` capped to the maximum group count, topped up to
    /// the minimum with synthesized groups whose titles are not yet used.
    pub fn fill(&self, mut existing: Vec<PlotGroup>, profile: &DatasetProfile) -> Result<Vec<PlotGroup>> {
        let (min, max) = (self.config.min_plot_groups, self.config.max_plot_groups);
        existing.truncate(max);
        if existing.len() >= min {
            return Ok(existing);
        }
        if profile.columns.is_empty() {
            return Err(InsightError::EmptyDataset);
        }

        let mut seen: HashSet<String> = existing.iter().map(|g| g.group_title.to_lowercase()).collect();
        for strategy in &self.strategies {
            if existing.len() >= min {
                break;
            }
            let candidates = strategy.synthesize(profile, &self.config);
            debug!(strategy = strategy.name(), candidates = candidates.len(), "Synthesizing plot groups");

            for group in candidates {
                if existing.len() >= max {
                    break;
                }
                if group.plots.is_empty() || !seen.insert(group.group_title.to_lowercase()) {
                    continue;
                }
                existing.push(group);
            }
        }

        if existing.len() < min {
            return Err(InsightError::Internal(format!(
                "could only synthesize {} of {} plot groups",
                existing.len(),
                min
            )));
        }
        Ok(existing)
    }
}

// ============================================================================
// Summary and insight defaults
// ============================================================================

/// The ideas section in the form summaries are expected to end with.
pub fn default_ideas_section() -> String {
    let mut section = String::from("Further exploration ideas\n");
    for idea in DEFAULT_IDEAS {
        section.push_str("- ");
        section.push_str(idea);
        section.push('\n');
    }
    section
}

/// Append [`default_ideas_section`] unless `summary` already has one.
pub fn ensure_ideas_section(summary: &str) -> String {
    if summary.to_ascii_lowercase().contains(IDEAS_MARKER) {
        return summary.to_string();
    }
    format!("{}\n\n{}", summary.trim_end(), default_ideas_section())
}

fn type_counts(profile: &DatasetProfile) -> String {
    format!(
        "{} numeric, {} categorical and {} temporal",
        profile.columns_of_type(ColumnType::Numeric).len(),
        profile.columns_of_type(ColumnType::Categorical).len(),
        profile.columns_of_type(ColumnType::Temporal).len()
    )
}

/// Short static summary used when no usable summary is available.
pub fn default_summary(profile: &DatasetProfile) -> String {
    format!(
        "This dataset contains {} rows across {} columns ({} columns). The charts below cover \
        the distribution of each measure, the split of records across categories and, where dates \
        are present, how values change over time.\n\n{}",
        profile.row_count,
        profile.columns.len(),
        type_counts(profile),
        default_ideas_section()
    )
}

/// A factual insight describing the dataset's shape.
pub fn overview_insight(profile: &DatasetProfile) -> Insight {
    let mut content = format!(
        "The dataset has {} rows and {} columns: {}.",
        profile.row_count,
        profile.columns.len(),
        type_counts(profile)
    );

    if let Some(sparse) = profile
        .columns
        .iter()
        .filter(|c| c.missing_count > 0)
        .max_by_key(|c| c.missing_count)
    {
        content.push_str(&format!(
            " {} has the most missing values ({} of {}).",
            sparse.name, sparse.missing_count, profile.row_count
        ));
    } else if !profile.columns.is_empty() {
        content.push_str(" No column has missing values.");
    }

    Insight {
        title: "Dataset overview".to_string(),
        content,
        score: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(name: &str, column_type: ColumnType, missing_count: usize) -> ColumnProfile {
        ColumnProfile {
            name: name.to_string(),
            column_type,
            missing_count,
            distinct_count: 10,
            stats: None,
            range: None,
            top_values: None,
        }
    }

    fn sales_profile() -> DatasetProfile {
        DatasetProfile {
            row_count: 100,
            columns: vec![
                column("date", ColumnType::Temporal, 0),
                column("region", ColumnType::Categorical, 3),
                column("revenue", ColumnType::Numeric, 0),
                column("units", ColumnType::Numeric, 1),
            ],
        }
    }

    fn assert_within_bounds(groups: &[PlotGroup], profile: &DatasetProfile, config: &EngineConfig) {
        assert!(groups.len() >= config.min_plot_groups && groups.len() <= config.max_plot_groups);
        for group in groups {
            assert!(group.plots.len() >= config.min_plots_per_group);
            assert!(group.plots.len() <= config.max_plots_per_group);
            for plot in &group.plots {
                assert!(profile.column(&plot.spec.x_key).is_some());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Strategy tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_profile_driven_groups() {
        let config = EngineConfig::default();
        let groups = ProfileDrivenStrategy.synthesize(&sales_profile(), &config);
        let titles: Vec<&str> = groups.iter().map(|g| g.group_title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Distribution of key measures",
                "Category breakdown",
                "Trends over time",
                "Relationships between measures",
                "Segment comparison",
            ]
        );

        let trends = &groups[2];
        assert_eq!(trends.plots[0].chart_type, ChartType::Line);
        assert_eq!(trends.plots[0].spec.x_key, "date");
        assert_eq!(trends.plots[0].y_key(), Some("revenue"));
    }

    #[test]
    fn test_single_plot_groups_get_companions() {
        let config = EngineConfig::default();
        let groups = ProfileDrivenStrategy.synthesize(&sales_profile(), &config);
        let categories = &groups[1];
        assert_eq!(categories.plots.len(), 2);
        assert_eq!(categories.plots[0].spec.x_key, "region");
        assert_ne!(categories.plots[0], categories.plots[1]);
    }

    #[test]
    fn test_companions_are_not_repeated_across_groups() {
        let config = EngineConfig::default();
        let profile = DatasetProfile {
            row_count: 40,
            columns: vec![
                column("date", ColumnType::Temporal, 0),
                column("region", ColumnType::Categorical, 0),
                column("revenue", ColumnType::Numeric, 0),
            ],
        };
        let groups = ProfileDrivenStrategy.synthesize(&profile, &config);
        assert_eq!(groups.len(), 4);

        let plots: Vec<&ChartSpecification> = groups.iter().flat_map(|g| &g.plots).collect();
        for (i, plot) in plots.iter().enumerate() {
            assert!(!plots[i + 1..].contains(plot), "repeated plot {plot:?}");
        }
        // a companion never re-plots the group's own column when another is free
        assert_eq!(groups[0].plots[1].spec.x_key, "date");
        assert_ne!(groups[1].plots[1].spec.x_key, "region");
    }

    #[test]
    fn test_profile_driven_needs_types() {
        let profile = DatasetProfile {
            row_count: 5,
            columns: vec![column("notes", ColumnType::Categorical, 0)],
        };
        let groups = ProfileDrivenStrategy.synthesize(&profile, &EngineConfig::default());
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_column_position_cycles_columns() {
        let config = EngineConfig::default();
        let profile = DatasetProfile {
            row_count: 5,
            columns: vec![column("notes", ColumnType::Categorical, 0)],
        };
        let groups = ColumnPositionStrategy.synthesize(&profile, &config);
        assert_eq!(groups.len(), config.max_plot_groups);
        assert_eq!(groups[0].group_title, "Overview of key columns");
        assert_eq!(groups[1].group_title, "Closer look at notes");
        assert_eq!(groups[2].group_title, "Closer look at notes (2)");
        assert_within_bounds(&groups, &profile, &config);
    }

    // -------------------------------------------------------------------------
    // Synthesizer tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_fill_keeps_existing_and_tops_up() {
        let config = EngineConfig::default();
        let profile = sales_profile();
        let existing = vec![PlotGroup {
            group_title: "Category Breakdown".to_string(),
            group_narrative: String::new(),
            plots: vec![histogram("revenue"), histogram("units")],
        }];

        let groups = DefaultGroupSynthesizer::new(config.clone()).fill(existing, &profile).unwrap();
        assert_eq!(groups.len(), config.max_plot_groups);
        assert_eq!(groups[0].group_title, "Category Breakdown");
        let duplicates = groups
            .iter()
            .filter(|g| g.group_title.eq_ignore_ascii_case("category breakdown"))
            .count();
        assert_eq!(duplicates, 1);
        assert_within_bounds(&groups, &profile, &config);
    }

    #[test]
    fn test_fill_truncates_excess() {
        let config = EngineConfig::default();
        let group = PlotGroup {
            group_title: "g".to_string(),
            group_narrative: String::new(),
            plots: vec![histogram("revenue"), histogram("units")],
        };
        let groups = DefaultGroupSynthesizer::new(config)
            .fill(vec![group; 7], &sales_profile())
            .unwrap();
        assert_eq!(groups.len(), 5);
    }

    #[test]
    fn test_fill_single_column_dataset() {
        let config = EngineConfig::default();
        let profile = DatasetProfile {
            row_count: 3,
            columns: vec![column("score", ColumnType::Numeric, 0)],
        };
        let groups = DefaultGroupSynthesizer::new(config.clone()).fill(Vec::new(), &profile).unwrap();
        assert_within_bounds(&groups, &profile, &config);
    }

    #[test]
    fn test_fill_without_columns_fails() {
        let result = DefaultGroupSynthesizer::new(EngineConfig::default()).fill(Vec::new(), &DatasetProfile::default());
        assert!(matches!(result, Err(InsightError::EmptyDataset)));
    }

    // -------------------------------------------------------------------------
    // Summary tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_summary_has_ideas() {
        let summary = default_summary(&sales_profile());
        assert!(summary.starts_with("This dataset contains 100 rows across 4 columns"));
        assert!(summary.contains("2 numeric, 1 categorical and 1 temporal"));
        assert!(summary.to_ascii_lowercase().contains(IDEAS_MARKER));
    }

    #[test]
    fn test_ensure_ideas_section() {
        let with = "Text.\n\nFurther Exploration Ideas\n- a";
        assert_eq!(ensure_ideas_section(with), with);

        let without = ensure_ideas_section("Text.");
        assert!(without.starts_with("Text.\n\nFurther exploration ideas\n- "));
    }

    #[test]
    fn test_overview_insight_mentions_sparse_column() {
        let insight = overview_insight(&sales_profile());
        assert_eq!(insight.title, "Dataset overview");
        assert!(insight.content.contains("region has the most missing values (3 of 100)"));
    }
}
