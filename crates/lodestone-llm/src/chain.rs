//! Primary/fallback provider chain.

use std::sync::Arc;

use tracing::{info, warn};

use crate::openrouter::OpenRouterTextProvider;
use crate::provider::{GenerationOptions, TextGenerationProvider};

/// Generation chain: primary provider first, then the fallback provider
/// walked across its model list. Exhaustion yields `None` - callers
/// substitute their documented safe defaults rather than erroring.
pub struct ProviderChain {
    primary: Option<Arc<dyn TextGenerationProvider>>,
    fallback: Option<OpenRouterTextProvider>,
    fallback_models: Vec<String>,
}

impl ProviderChain {
    pub fn new(
        primary: Option<Arc<dyn TextGenerationProvider>>,
        fallback: Option<OpenRouterTextProvider>,
        fallback_models: Vec<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            fallback_models,
        }
    }

    /// Whether any provider is configured at all.
    pub fn is_available(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    /// Generate text, degrading across providers. Returns `None` when every
    /// configured provider failed.
    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        options: &GenerationOptions,
    ) -> Option<String> {
        if let Some(primary) = &self.primary {
            match primary.generate(prompt, system_prompt, options).await {
                Ok(text) => return Some(text),
                Err(e) => {
                    warn!(provider = primary.provider_name(), error = %e, "primary provider failed");
                }
            }
        }

        if let Some(fallback) = &self.fallback {
            let fallback_options = GenerationOptions {
                max_tokens: options.max_tokens.min(2048),
                ..GenerationOptions::fallback()
            };
            for model in &self.fallback_models {
                match fallback
                    .generate_with_model(prompt, system_prompt, &fallback_options, model)
                    .await
                {
                    Ok(text) => {
                        info!(model, "fallback provider answered");
                        return Some(text);
                    }
                    Err(e) => {
                        warn!(model, error = %e, "fallback model failed");
                    }
                }
            }
        }

        warn!("all generation providers exhausted");
        None
    }
}
