//! LLM provider trait for insight generation.
//!
//! This module defines the [`InsightProvider`] trait that lets the insight
//! pipeline talk to any chat-completion backend (OpenAI, OpenRouter, a local
//! model, or a scripted mock in tests) without changing validation logic.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement the [`InsightProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! Providers return the model's raw text. Parsing, validation and repair are
//! done by [`crate::insights::InsightValidator`], so a provider never needs
//! to understand the payload schema.

use crate::types::{InsightRequest, PlotGroup};
use anyhow::Result;

/// Trait for LLM providers that describe datasets.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage across threads.
///
/// # Error Handling
///
/// Implementations should return meaningful errors via `anyhow::Result`.
/// A failed initial call is a hard error for the caller; failed repair calls
/// are logged and replaced by rule-based content.
pub trait InsightProvider: Send + Sync {
    /// Produce the full insight response (insights, plot groups, summary)
    /// for a profiled dataset.
    fn generate_insights(&self, request: &InsightRequest) -> Result<String>;

    /// Ask for a response whose `plotGroups` expands `current` to the
    /// configured group count.
    fn expand_plot_groups(&self, request: &InsightRequest, current: &[PlotGroup]) -> Result<String>;

    /// Ask for a longer version of `current_summary`.
    fn expand_summary(&self, request: &InsightRequest, current_summary: &str) -> Result<String>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}
