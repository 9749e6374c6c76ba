use async_trait::async_trait;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Language-generation collaborator: prompt in, free-form text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Stands in when no API key is configured: every call fails, so every
/// summary takes the fallback path
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Generation("no language model configured".to_string()))
    }
}

/// [`TextGenerator`] over the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let api_key = config.resolved_api_key()?;
        // Connection-level cap; the summarizer applies its own tighter timeout
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.summarizer_timeout_secs.saturating_mul(2).max(1)))
            .build()
            .unwrap_or_default();
        Some(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}]
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        extract_text(&body)
    }
}

/// Concatenated text blocks of a Messages API reply
fn extract_text(body: &serde_json::Value) -> Result<String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| Error::Generation("reply has no content blocks".to_string()))?;

    let text: String = blocks
        .iter()
        .filter(|block| block["type"].as_str().unwrap_or("text") == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        return Err(Error::Generation("reply contained no text".to_string()));
    }
    Ok(text)
}
