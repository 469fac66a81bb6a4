//! OpenAI chat-completions provider.
//!
//! This module provides the [`OpenAiProvider`] which implements the
//! [`InsightProvider`] trait against the OpenAI chat-completions API
//! (<https://platform.openai.com/docs/api-reference/chat>). Any endpoint
//! speaking the same protocol (OpenRouter, a local gateway) works by
//! overriding the base URL.

use super::InsightProvider;
use super::prompt::{
    SYSTEM_PROMPT, build_group_expansion_prompt, build_insight_prompt, build_summary_expansion_prompt,
};
use crate::config::EngineConfig;
use crate::types::{InsightRequest, PlotGroup};
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default OpenAI API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for insight generation.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default temperature for model responses.
const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Default max tokens for responses.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// The model to use (e.g., "gpt-4o-mini").
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL for the API (useful for proxies or compatible gateways).
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OpenAiConfigBuilder {
        OpenAiConfigBuilder::default()
    }
}

/// Builder for [`OpenAiConfig`].
#[derive(Default)]
pub struct OpenAiConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl OpenAiConfigBuilder {
    /// Set the model to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature (0.0 - 2.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set a custom base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OpenAiConfig {
        OpenAiConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// OpenAI provider for dataset insights.
///
/// Every call sends [`SYSTEM_PROMPT`] and requests a JSON object response.
///
/// # Example
///
/// ```rust,ignore
/// use datastory::ai::{OpenAiConfig, OpenAiProvider};
///
/// // Key from OPENAI_API_KEY
/// let provider = OpenAiProvider::from_env()?;
///
/// // With custom configuration
/// let config = OpenAiConfig::builder().model("gpt-4o").temperature(0.2).build();
/// let provider = OpenAiProvider::with_config("your-api-key", config)?;
/// ```
pub struct OpenAiProvider {
    api_key: String,
    config: OpenAiConfig,
    engine: EngineConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, OpenAiConfig::default())
    }

    /// Create a provider using the key from the `OPENAI_API_KEY` variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{} is not set", API_KEY_ENV))?;
        Self::new(key)
    }

    /// Create a new provider with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            engine: EngineConfig::default(),
            client,
        })
    }

    /// Use `engine` for the group and summary bounds quoted in prompts.
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);
        debug!(model = %self.config.model, prompt_chars = prompt.len(), "Calling OpenAI");

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenAI API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        let result: ChatResponse = response.json()?;
        first_content(result)
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .map(|msg| msg.content)
        .ok_or_else(|| anyhow!("No response content from OpenAI API"))
}

impl InsightProvider for OpenAiProvider {
    fn generate_insights(&self, request: &InsightRequest) -> Result<String> {
        self.call_api(&build_insight_prompt(request, &self.engine))
    }

    fn expand_plot_groups(&self, request: &InsightRequest, current: &[PlotGroup]) -> Result<String> {
        self.call_api(&build_group_expansion_prompt(request, current, &self.engine))
    }

    fn expand_summary(&self, request: &InsightRequest, current_summary: &str) -> Result<String> {
        self.call_api(&build_summary_expansion_prompt(request, current_summary, &self.engine))
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // ChatResponse parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_valid_response_structure() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"insights\": []}"
                }
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_content(response).unwrap(), "{\"insights\": []}");
    }

    #[test]
    fn test_parse_response_with_empty_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_content(response).is_err());
    }

    #[test]
    fn test_parse_response_with_null_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": null}"#).unwrap();
        assert!(response.choices.is_none());
        assert!(first_content(response).is_err());
    }

    #[test]
    fn test_parse_response_missing_message() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": [{"message": null}]}"#).unwrap();
        let err = first_content(response).unwrap_err();
        assert!(err.to_string().contains("No response content"));
    }

    // -------------------------------------------------------------------------
    // Request shape tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_request_asks_for_json_object() {
        let provider = OpenAiProvider::new("test-key").unwrap();
        let request = provider.build_request("describe");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["content"], "describe");
    }

    // -------------------------------------------------------------------------
    // Config builder tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_builder_defaults() {
        let config = OpenAiConfig::builder().build();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_config_builder_custom_values() {
        let config = OpenAiConfig::builder()
            .model("gpt-4o")
            .temperature(0.2)
            .max_tokens(2000)
            .timeout_secs(60)
            .base_url("https://openrouter.ai/api/v1/chat/completions")
            .build();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1/chat/completions");
    }

    // -------------------------------------------------------------------------
    // Provider tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_provider_name_and_model() {
        let config = OpenAiConfig::builder().model("gpt-4o").build();
        let provider = OpenAiProvider::with_config("test-key", config).unwrap();

        assert_eq!(provider.name(), "OpenAI");
        assert_eq!(provider.model(), Some("gpt-4o"));
    }

    #[test]
    fn test_engine_config_is_applied() {
        let engine = EngineConfig::builder().min_summary_chars(300).build().unwrap();
        let provider = OpenAiProvider::new("test-key").unwrap().with_engine_config(engine);
        assert_eq!(provider.engine.min_summary_chars, 300);
    }
}
