//! Human-readable chart titles and tab labels.

use crate::types::{Aggregation, ChartSpecification, ChartType};

/// Card title for a chart.
pub fn chart_title(chart: &ChartSpecification) -> String {
    let x = chart.spec.x_key.as_str();
    match (chart.chart_type, chart.spec.aggregation, chart.y_key()) {
        (ChartType::Histogram, _, _) => format!("Distribution of {x}"),
        (_, Aggregation::Count, _) => format!("Count by {x}"),
        (_, Aggregation::Sum, Some(y)) => format!("Total {y} by {x}"),
        (_, Aggregation::Avg, Some(y)) => format!("Average {y} by {x}"),
        (_, _, Some(y)) => format!("{x} vs {y}"),
        _ => x.to_string(),
    }
}

/// Short label for the chart's tab within a plot group.
pub fn plot_label(chart: &ChartSpecification, index: usize) -> String {
    let x = chart.spec.x_key.trim();
    match (chart.chart_type, chart.spec.aggregation, chart.y_key()) {
        (ChartType::Histogram, _, _) if !x.is_empty() => format!("{x} Distribution"),
        (_, Aggregation::Count, _) if !x.is_empty() => format!("Count by {x}"),
        (_, Aggregation::Sum, Some(y)) => format!("Total {y}"),
        (_, Aggregation::Avg, Some(y)) => format!("Average {y}"),
        (_, _, Some(y)) if !x.is_empty() => format!("{x} vs {y}"),
        _ if !x.is_empty() => format!("{x} Analysis"),
        _ => format!("Chart {}", index + 1),
    }
}
