//! AI module for LLM-written dataset stories.
//!
//! This module provides a trait-based abstraction for insight providers,
//! allowing the insight pipeline to work with any chat-completion backend.
//!
//! # Feature Flag
//!
//! The concrete [`OpenAiProvider`] requires the `ai` feature flag. The
//! [`InsightProvider`] trait and the prompt builders are always available
//! for custom implementations.
//!
//! ```toml
//! # Enable AI support (default)
//! datastory = { version = "0.1", features = ["ai"] }
//!
//! # Rule-based insights only
//! datastory = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use datastory::ai::OpenAiProvider;
//! use datastory::InsightPipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(OpenAiProvider::from_env()?);
//!
//! let report = InsightPipeline::builder()
//!     .provider(provider)
//!     .build()?
//!     .generate(&dataset)?;
//! ```

// Provider trait is always available (for custom implementations)
mod provider;
pub mod prompt;
pub use provider::InsightProvider;

// Concrete providers require the "ai" feature
#[cfg(feature = "ai")]
mod openai;

#[cfg(feature = "ai")]
pub use openai::{API_KEY_ENV, OpenAiConfig, OpenAiConfigBuilder, OpenAiProvider};
