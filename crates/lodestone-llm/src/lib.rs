//! # Lodestone LLM
//!
//! Language-model integration for Lodestone: text generation and embedding
//! providers behind small traits, with a primary/fallback chain.
//!
//! - **Gemini** is the primary provider for both generation and embeddings
//! - **OpenRouter** is the fallback generation provider, walked across a
//!   fixed model list when the primary fails
//! - Every call carries a bounded timeout and output-token ceiling;
//!   failures degrade to the caller's documented fallback paths instead of
//!   hanging or propagating

pub mod chain;
pub mod embedding;
pub mod gemini;
pub mod openrouter;
pub mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chain::ProviderChain;
pub use embedding::{cosine_similarity, EmbeddingError, EmbeddingProvider, EmbeddingResult};
pub use gemini::{GeminiEmbeddingProvider, GeminiTextProvider};
pub use openrouter::OpenRouterTextProvider;
pub use provider::{GenerationOptions, LlmError, LlmResult, TextGenerationProvider};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockEmbeddingProvider, MockTextProvider};
