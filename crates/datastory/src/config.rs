//! Configuration types for the insight engine.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic engine setup.

use serde::{Deserialize, Serialize};

/// Configuration for profiling, chart derivation and insight validation.
///
/// Use [`EngineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use datastory::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .prompt_sample_size(40)
///     .max_categories(15)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of rows kept in the persisted sample used for rendering.
    /// Default: 1000
    pub storage_sample_size: usize,

    /// Number of rows embedded in the LLM prompt.
    /// Default: 60
    pub prompt_sample_size: usize,

    /// Non-null values inspected when inferring a column type for the profile.
    /// Default: 50
    pub profile_type_window: usize,

    /// Non-null values inspected when re-detecting an axis type at render time.
    /// Default: 10
    pub render_type_window: usize,

    /// Number of `{value, count}` pairs kept for categorical columns.
    /// Default: 10
    pub top_values_limit: usize,

    /// Categories kept before the remainder is folded into "Other". Also the
    /// distinct-value count above which a numeric bar chart becomes a histogram.
    /// Default: 20
    pub max_categories: usize,

    /// Share of x values that must parse as numbers for the axis to look numeric.
    /// Default: 0.8
    pub numeric_axis_ratio: f64,

    /// Temporal line/area charts with more points than this are flagged for scatter rendering.
    /// Default: 20
    pub temporal_scatter_threshold: usize,

    /// Minimum number of plot groups in a validated insight payload.
    /// Default: 4
    pub min_plot_groups: usize,

    /// Maximum number of plot groups in a validated insight payload.
    /// Default: 5
    pub max_plot_groups: usize,

    /// Minimum number of plots in a plot group.
    /// Default: 2
    pub min_plots_per_group: usize,

    /// Maximum number of plots in a plot group.
    /// Default: 5
    pub max_plots_per_group: usize,

    /// Minimum length (in characters) of the long-form summary.
    /// Default: 900
    pub min_summary_chars: usize,

    /// Maximum number of points handed to the rendering layer per chart.
    /// Default: 500
    pub max_render_points: usize,

    /// Maximum number of pie slices handed to the rendering layer.
    /// Default: 12
    pub max_pie_slices: usize,

    /// Seed for the vertical jitter of unlabeled categorical points.
    /// Default: 42
    pub jitter_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_sample_size: 1000,
            prompt_sample_size: 60,
            profile_type_window: 50,
            render_type_window: 10,
            top_values_limit: 10,
            max_categories: 20,
            numeric_axis_ratio: 0.8,
            temporal_scatter_threshold: 20,
            min_plot_groups: 4,
            max_plot_groups: 5,
            min_plots_per_group: 2,
            max_plots_per_group: 5,
            min_summary_chars: 900,
            max_render_points: 500,
            max_pie_slices: 12,
            jitter_seed: 42,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("storage_sample_size", self.storage_sample_size),
            ("prompt_sample_size", self.prompt_sample_size),
        ] {
            if value < 2 {
                return Err(ConfigValidationError::SampleTooSmall {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("profile_type_window", self.profile_type_window),
            ("render_type_window", self.render_type_window),
            ("top_values_limit", self.top_values_limit),
            ("max_categories", self.max_categories),
            ("min_plots_per_group", self.min_plots_per_group),
            ("max_render_points", self.max_render_points),
            ("max_pie_slices", self.max_pie_slices),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::Zero(field.to_string()));
            }
        }

        if !(self.numeric_axis_ratio > 0.0 && self.numeric_axis_ratio <= 1.0) {
            return Err(ConfigValidationError::InvalidRatio(self.numeric_axis_ratio));
        }

        if self.min_plot_groups > self.max_plot_groups {
            return Err(ConfigValidationError::InvertedBounds {
                field: "plot_groups".to_string(),
                min: self.min_plot_groups,
                max: self.max_plot_groups,
            });
        }

        if self.min_plots_per_group > self.max_plots_per_group {
            return Err(ConfigValidationError::InvertedBounds {
                field: "plots_per_group".to_string(),
                min: self.min_plots_per_group,
                max: self.max_plots_per_group,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid sample size for '{field}': {value} (must be at least 2)")]
    SampleTooSmall { field: String, value: usize },

    #[error("'{0}' must be greater than zero")]
    Zero(String),

    #[error("Invalid numeric axis ratio: {0} (must be in (0.0, 1.0])")]
    InvalidRatio(f64),

    #[error("Invalid bounds for '{field}': min {min} exceeds max {max}")]
    InvertedBounds {
        field: String,
        min: usize,
        max: usize,
    },
}

impl From<ConfigValidationError> for crate::error::InsightError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::InsightError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    storage_sample_size: Option<usize>,
    prompt_sample_size: Option<usize>,
    profile_type_window: Option<usize>,
    render_type_window: Option<usize>,
    top_values_limit: Option<usize>,
    max_categories: Option<usize>,
    numeric_axis_ratio: Option<f64>,
    temporal_scatter_threshold: Option<usize>,
    plot_groups: Option<(usize, usize)>,
    plots_per_group: Option<(usize, usize)>,
    min_summary_chars: Option<usize>,
    max_render_points: Option<usize>,
    max_pie_slices: Option<usize>,
    jitter_seed: Option<u64>,
}

impl EngineConfigBuilder {
    /// Set the number of rows kept in the persisted sample.
    pub fn storage_sample_size(mut self, size: usize) -> Self {
        self.storage_sample_size = Some(size);
        self
    }

    /// Set the number of rows embedded in the LLM prompt.
    pub fn prompt_sample_size(mut self, size: usize) -> Self {
        self.prompt_sample_size = Some(size);
        self
    }

    /// Set the profiling type-inference window.
    pub fn profile_type_window(mut self, window: usize) -> Self {
        self.profile_type_window = Some(window);
        self
    }

    /// Set the render-time type-inference window.
    pub fn render_type_window(mut self, window: usize) -> Self {
        self.render_type_window = Some(window);
        self
    }

    /// Set how many top values are kept for categorical columns.
    pub fn top_values_limit(mut self, limit: usize) -> Self {
        self.top_values_limit = Some(limit);
        self
    }

    /// Set the category cap used before folding into "Other".
    pub fn max_categories(mut self, max: usize) -> Self {
        self.max_categories = Some(max);
        self
    }

    /// Set the share of numeric values needed for an axis to look numeric.
    ///
    /// # Arguments
    /// * `ratio` - Value in (0.0, 1.0] (e.g., 0.8 = 80%)
    pub fn numeric_axis_ratio(mut self, ratio: f64) -> Self {
        self.numeric_axis_ratio = Some(ratio);
        self
    }

    /// Set the point count above which temporal line charts render as scatter.
    pub fn temporal_scatter_threshold(mut self, threshold: usize) -> Self {
        self.temporal_scatter_threshold = Some(threshold);
        self
    }

    /// Set the accepted number of plot groups.
    pub fn plot_groups(mut self, min: usize, max: usize) -> Self {
        self.plot_groups = Some((min, max));
        self
    }

    /// Set the accepted number of plots per group.
    pub fn plots_per_group(mut self, min: usize, max: usize) -> Self {
        self.plots_per_group = Some((min, max));
        self
    }

    /// Set the minimum summary length in characters.
    pub fn min_summary_chars(mut self, chars: usize) -> Self {
        self.min_summary_chars = Some(chars);
        self
    }

    /// Set the maximum number of points handed to the renderer.
    pub fn max_render_points(mut self, points: usize) -> Self {
        self.max_render_points = Some(points);
        self
    }

    /// Set the maximum number of pie slices.
    pub fn max_pie_slices(mut self, slices: usize) -> Self {
        self.max_pie_slices = Some(slices);
        self
    }

    /// Set the jitter seed.
    pub fn jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let (min_plot_groups, max_plot_groups) = self
            .plot_groups
            .unwrap_or((defaults.min_plot_groups, defaults.max_plot_groups));
        let (min_plots_per_group, max_plots_per_group) = self
            .plots_per_group
            .unwrap_or((defaults.min_plots_per_group, defaults.max_plots_per_group));

        let config = EngineConfig {
            storage_sample_size: self
                .storage_sample_size
                .unwrap_or(defaults.storage_sample_size),
            prompt_sample_size: self
                .prompt_sample_size
                .unwrap_or(defaults.prompt_sample_size),
            profile_type_window: self
                .profile_type_window
                .unwrap_or(defaults.profile_type_window),
            render_type_window: self
                .render_type_window
                .unwrap_or(defaults.render_type_window),
            top_values_limit: self.top_values_limit.unwrap_or(defaults.top_values_limit),
            max_categories: self.max_categories.unwrap_or(defaults.max_categories),
            numeric_axis_ratio: self
                .numeric_axis_ratio
                .unwrap_or(defaults.numeric_axis_ratio),
            temporal_scatter_threshold: self
                .temporal_scatter_threshold
                .unwrap_or(defaults.temporal_scatter_threshold),
            min_plot_groups,
            max_plot_groups,
            min_plots_per_group,
            max_plots_per_group,
            min_summary_chars: self.min_summary_chars.unwrap_or(defaults.min_summary_chars),
            max_render_points: self.max_render_points.unwrap_or(defaults.max_render_points),
            max_pie_slices: self.max_pie_slices.unwrap_or(defaults.max_pie_slices),
            jitter_seed: self.jitter_seed.unwrap_or(defaults.jitter_seed),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage_sample_size, 1000);
        assert_eq!(config.prompt_sample_size, 60);
        assert_eq!(config.max_categories, 20);
        assert_eq!(config.min_summary_chars, 900);
        assert_eq!((config.min_plot_groups, config.max_plot_groups), (4, 5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .prompt_sample_size(30)
            .max_categories(8)
            .plot_groups(3, 6)
            .jitter_seed(7)
            .build()
            .unwrap();

        assert_eq!(config.prompt_sample_size, 30);
        assert_eq!(config.max_categories, 8);
        assert_eq!(config.min_plot_groups, 3);
        assert_eq!(config.max_plot_groups, 6);
        assert_eq!(config.jitter_seed, 7);
    }

    #[test]
    fn test_validation_sample_too_small() {
        let result = EngineConfig::builder().prompt_sample_size(1).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::SampleTooSmall { value: 1, .. }
        ));
    }

    #[test]
    fn test_validation_invalid_ratio() {
        let result = EngineConfig::builder().numeric_axis_ratio(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidRatio(_)
        ));
    }

    #[test]
    fn test_validation_inverted_bounds() {
        let result = EngineConfig::builder().plots_per_group(4, 2).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvertedBounds { min: 4, max: 2, .. }
        ));
    }

    #[test]
    fn test_config_from_json() {
        let mut value = serde_json::to_value(EngineConfig::default()).unwrap();
        value["max_categories"] = serde_json::json!(12);
        value["jitter_seed"] = serde_json::json!(99);

        let config: EngineConfig =
            serde_json::from_value(value).expect("Should deserialize from frontend JSON");
        assert_eq!(config.max_categories, 12);
        assert_eq!(config.jitter_seed, 99);
        assert_eq!(config.storage_sample_size, 1000);
    }
}
