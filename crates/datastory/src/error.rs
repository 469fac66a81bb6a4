//! Custom error types for the insight engine.
//!
//! This module provides the error hierarchy using `thiserror`. Only genuine
//! failures surface here: malformed cells, bad chart specs and empty results
//! are folded into counts or typed outcomes (see [`crate::charts::ChartOutcome`])
//! and never become errors.
//!
//! Errors are serializable so they can be handed to a frontend as-is.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Maximum number of characters of an offending LLM response kept for diagnostics.
pub const SNIPPET_LEN: usize = 200;

/// The main error type for the insight engine.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The first CSV record is not a usable header row.
    #[error("Invalid CSV header: {0}")]
    InvalidHeader(String),

    /// The dataset has no columns or no rows to work with.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// The LLM response contained no parseable JSON object.
    #[error("LLM response is not valid JSON: {snippet}")]
    MalformedResponse { snippet: String },

    /// The LLM response parsed but carries none of the expected sections.
    #[error("LLM response is missing plotGroups, charts and summary: {snippet}")]
    IncompleteResponse { snippet: String },

    /// Chart series could not be derived.
    #[error("Failed to process chart data: {0}")]
    ChartProcessing(String),

    /// AI client error.
    #[error("AI client error: {0}")]
    AiClientError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (for AI client, only with "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InsightError>,
    },
}

impl InsightError {
    /// Build a [`InsightError::MalformedResponse`] from the offending text.
    pub fn malformed(text: &str) -> Self {
        Self::MalformedResponse {
            snippet: snippet(text),
        }
    }

    /// Build a [`InsightError::IncompleteResponse`] from the offending text.
    pub fn incomplete(text: &str) -> Self {
        Self::IncompleteResponse {
            snippet: snippet(text),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InsightError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidHeader(_) => "INVALID_HEADER",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::IncompleteResponse { .. } => "INCOMPLETE_RESPONSE",
            Self::ChartProcessing(_) => "CHART_PROCESSING_FAILED",
            Self::AiClientError(_) => "AI_CLIENT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the caller can fall back (e.g. to rule-based insights) instead of failing.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::MalformedResponse { .. }
            | Self::IncompleteResponse { .. }
            | Self::AiClientError(_)
            | Self::InvalidHeader(_) => true,
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SNIPPET_LEN).collect();
    format!("{cut}...")
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for InsightError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InsightError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InsightError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InsightError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(InsightError::EmptyDataset.error_code(), "EMPTY_DATASET");
        assert_eq!(
            InsightError::InvalidHeader("blank".to_string()).error_code(),
            "INVALID_HEADER"
        );
        assert_eq!(
            InsightError::malformed("nope").error_code(),
            "MALFORMED_RESPONSE"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(InsightError::malformed("x").is_recoverable());
        assert!(InsightError::AiClientError("timeout".to_string()).is_recoverable());
        assert!(!InsightError::EmptyDataset.is_recoverable());
        assert!(
            InsightError::incomplete("{}")
                .with_context("During validation")
                .is_recoverable()
        );
    }

    #[test]
    fn test_snippet_is_truncated() {
        let long = "x".repeat(SNIPPET_LEN * 2);
        match InsightError::malformed(&long) {
            InsightError::MalformedResponse { snippet } => {
                assert_eq!(snippet.chars().count(), SNIPPET_LEN + 3);
                assert!(snippet.ends_with("..."));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let error = InsightError::AiClientError("quota exceeded".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("AI_CLIENT_ERROR"));
        assert!(json.contains("quota exceeded"));
    }

    #[test]
    fn test_with_context() {
        let error = InsightError::EmptyDataset.with_context("During profiling");
        assert!(error.to_string().contains("During profiling"));
        assert_eq!(error.error_code(), "EMPTY_DATASET");
    }
}
