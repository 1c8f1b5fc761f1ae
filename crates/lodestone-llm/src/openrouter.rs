//! OpenRouter fallback provider (chat-completions API).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::provider::{GenerationOptions, LlmError, LlmResult, TextGenerationProvider};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter text generation provider.
///
/// Exposes the same shape as the primary provider plus a per-call model
/// name; the [`crate::ProviderChain`] walks its model list in order when
/// the primary fails.
pub struct OpenRouterTextProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
    timeout: Duration,
}

impl OpenRouterTextProvider {
    pub fn new(api_key: String, default_model: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            default_model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Generate with an explicit model name.
    pub async fn generate_with_model(
        &self,
        prompt: &str,
        system_prompt: &str,
        options: &GenerationOptions,
        model: &str,
    ) -> LlmResult<String> {
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": prompt },
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, model, "OpenRouter API error");
            return Err(LlmError::InvalidResponse(format!(
                "OpenRouter API error ({status})"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerationProvider for OpenRouterTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        options: &GenerationOptions,
    ) -> LlmResult<String> {
        let model = self.default_model.clone();
        self.generate_with_model(prompt, system_prompt, options, &model)
            .await
    }

    fn provider_name(&self) -> &str {
        "OpenRouter"
    }
}

// OpenRouter API response types

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_reports_name() {
        let provider =
            OpenRouterTextProvider::new("key".into(), "google/gemma-3-27b-it:free".into(), 30);
        assert_eq!(provider.provider_name(), "OpenRouter");
    }
}
