//! Pipeline module.
//!
//! This module provides the insight pipeline and the records it produces.

mod builder;

pub use builder::{InsightPipeline, InsightPipelineBuilder};

use crate::insights::{SummarySections, split_summary};
use crate::types::{DatasetProfile, InsightPayload, Row};
use serde::{Deserialize, Serialize};

/// The persisted view of an uploaded dataset: schema, true row count and an
/// evenly spaced sample that charts are rendered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDataset {
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub sample_rows: Vec<Row>,
}

/// Everything produced for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub dataset: StoredDataset,
    pub profile: DatasetProfile,
    pub payload: InsightPayload,
}

impl InsightReport {
    /// The summary split into prose and follow-up ideas.
    pub fn summary_sections(&self) -> SummarySections {
        split_summary(&self.payload.summary_markdown)
    }
}
