//! Text generation trait and shared types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a text generation provider.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),

    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("generation blocked by provider safety filter")]
    SafetyBlocked,
}

/// Result alias for generation calls.
pub type LlmResult<T> = Result<T, LlmError>;

/// Sampling and length controls for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    /// Output-token ceiling; always bounded.
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 8192,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

impl GenerationOptions {
    /// Conservative settings used when walking fallback models.
    pub fn fallback() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

/// Opaque text-generation capability.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    /// Generate text for a prompt with an optional system instruction.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        options: &GenerationOptions,
    ) -> LlmResult<String>;

    /// Human-readable provider name for logs.
    fn provider_name(&self) -> &str;
}
