//! Main insight pipeline.
//!
//! This module provides the [`InsightPipeline`] struct and builder that
//! take a dataset from loaded rows to a validated insight report.

use super::{InsightReport, StoredDataset};
use crate::ai::InsightProvider;
use crate::charts::{ChartDataProcessor, ChartOutcome};
use crate::config::EngineConfig;
use crate::error::{InsightError, Result};
use crate::insights::InsightValidator;
use crate::profiler::DataProfiler;
use crate::sampling::downsample_evenly;
use crate::types::{ChartSpecification, Dataset, InsightRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Profiles a dataset, asks the provider for its story and validates the
/// answer.
///
/// Use [`InsightPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use datastory::{InsightPipeline, EngineConfig, load_csv};
/// use datastory::ai::OpenAiProvider;
/// use std::sync::Arc;
///
/// let dataset = load_csv("sales.csv")?;
///
/// // With an LLM provider
/// let report = InsightPipeline::builder()
///     .provider(Arc::new(OpenAiProvider::from_env()?))
///     .build()?
///     .generate(&dataset)?;
///
/// // Rule-based only
/// let pipeline = InsightPipeline::builder()
///     .config(EngineConfig::builder().storage_sample_size(500).build()?)
///     .build()?;
/// let report = pipeline.generate(&dataset)?;
///
/// for chart in &report.payload.charts {
///     let outcome = pipeline.render(&report.dataset, chart);
/// }
/// ```
pub struct InsightPipeline {
    config: EngineConfig,
    provider: Option<Arc<dyn InsightProvider>>,
    profiler: DataProfiler,
    charts: ChartDataProcessor,
    validator: InsightValidator,
}

// Shared across request handlers
static_assertions::assert_impl_all!(InsightPipeline: Send, Sync);

impl InsightPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> InsightPipelineBuilder {
        InsightPipelineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether generation will call an LLM provider.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Build the stored sample and the provider request for `dataset`.
    ///
    /// The profile always covers every row; only the row samples are
    /// bounded.
    pub fn prepare(&self, dataset: &Dataset) -> (StoredDataset, InsightRequest) {
        let profile = self.profiler.profile(dataset);

        let stored = StoredDataset {
            name: dataset.name.clone(),
            columns: dataset.columns.clone(),
            row_count: dataset.row_count(),
            sample_rows: downsample_evenly(&dataset.rows, self.config.storage_sample_size),
        };

        let request = InsightRequest {
            dataset_name: dataset.name.clone(),
            columns: dataset.columns.clone(),
            row_count: dataset.row_count(),
            profile,
            sample_rows: downsample_evenly(&dataset.rows, self.config.prompt_sample_size),
        };

        (stored, request)
    }

    /// Produce the full insight report for `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::EmptyDataset`] for a dataset without columns
    /// or rows, [`InsightError::AiClientError`] (or `HttpRequest` for
    /// transport failures) when the provider's initial call fails, and the
    /// validator's errors for unusable answers.
    pub fn generate(&self, dataset: &Dataset) -> Result<InsightReport> {
        match self.generate_internal(dataset) {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(dataset = %dataset.name, code = e.error_code(), "Insight generation failed: {}", e);
                Err(e)
            }
        }
    }

    fn generate_internal(&self, dataset: &Dataset) -> Result<InsightReport> {
        let start_time = Instant::now();
        if dataset.columns.is_empty() || dataset.rows.is_empty() {
            return Err(InsightError::EmptyDataset);
        }

        info!(
            dataset = %dataset.name,
            rows = dataset.row_count(),
            columns = dataset.columns.len(),
            "Starting insight generation"
        );
        let (stored, request) = self.prepare(dataset);

        let payload = match &self.provider {
            Some(provider) => {
                info!(
                    provider = provider.name(),
                    model = provider.model().unwrap_or("default"),
                    sample_rows = request.sample_rows.len(),
                    "Requesting insights"
                );
                let raw = provider.generate_insights(&request).map_err(provider_error)?;
                self.validator.validate(&raw, &request, Some(provider.as_ref()))?
            }
            None => {
                info!("No insight provider configured, using rule-based insights");
                self.validator.synthesize(&request)?
            }
        };

        info!(
            insights = payload.insights.len(),
            plot_groups = payload.plot_groups.len(),
            charts = payload.charts.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Insight generation complete"
        );

        Ok(InsightReport {
            dataset: stored,
            profile: request.profile,
            payload,
        })
    }

    /// Derive chart data for `chart` from the stored sample.
    pub fn render(&self, stored: &StoredDataset, chart: &ChartSpecification) -> ChartOutcome {
        self.charts.process_rows(&stored.sample_rows, &stored.columns, chart)
    }
}

/// Transport failures keep their `reqwest` source; anything else the
/// provider reports becomes [`InsightError::AiClientError`].
fn provider_error(e: anyhow::Error) -> InsightError {
    #[cfg(feature = "ai")]
    let e = match e.downcast::<reqwest::Error>() {
        Ok(http) => return InsightError::HttpRequest(http),
        Err(e) => e,
    };
    InsightError::AiClientError(e.to_string())
}

/// Builder for [`InsightPipeline`].
#[derive(Default)]
pub struct InsightPipelineBuilder {
    config: Option<EngineConfig>,
    provider: Option<Arc<dyn InsightProvider>>,
}

static_assertions::assert_impl_all!(InsightPipelineBuilder: Send);

impl InsightPipelineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the LLM provider.
    ///
    /// Without one the pipeline produces rule-based insights. Use `Arc` to
    /// share one provider between pipelines.
    pub fn provider(mut self, provider: Arc<dyn InsightProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<InsightPipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(InsightPipeline {
            profiler: DataProfiler::new(&config),
            charts: ChartDataProcessor::new(&config),
            validator: InsightValidator::new(config.clone()),
            provider: self.provider,
            config,
        })
    }
}
