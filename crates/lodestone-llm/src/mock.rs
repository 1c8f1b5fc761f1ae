//! Mock providers for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, EmbeddingResult};
use crate::provider::{GenerationOptions, LlmError, LlmResult, TextGenerationProvider};

/// Scripted text provider: returns queued responses in order, then repeats
/// the last one; or fails every call.
pub struct MockTextProvider {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl MockTextProvider {
    /// Always answer with the same text.
    pub fn with_response(text: &str) -> Self {
        Self::with_responses(vec![text.to_string()])
    }

    /// Answer with each response in order, repeating the final one.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call, simulating a dead provider.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: &str,
        _options: &GenerationOptions,
    ) -> LlmResult<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(LlmError::Http("mock provider down".to_string()));
        }
        let mut responses = self.responses.lock().unwrap();
        if let Some(next) = responses.pop_front() {
            *self.last.lock().unwrap() = Some(next.clone());
            Ok(next)
        } else if let Some(last) = self.last.lock().unwrap().clone() {
            Ok(last)
        } else {
            Err(LlmError::EmptyResponse)
        }
    }

    fn provider_name(&self) -> &str {
        "Mock"
    }
}

/// Deterministic embedding provider: hashes character trigrams into a
/// fixed-size vector, so identical texts embed identically and overlapping
/// texts score higher than disjoint ones.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dimensions(64)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lower = text.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        for window in chars.windows(3) {
            let mut hash: u64 = 1469598103934665603;
            for c in window {
                hash ^= *c as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn provider_name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let provider = MockEmbeddingProvider::new();
        let a = provider.embed("graphics card").await.unwrap();
        let b = provider.embed("graphics card").await.unwrap();
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn related_texts_score_higher_than_unrelated() {
        let provider = MockEmbeddingProvider::new();
        let query = provider.embed("msi graphics card").await.unwrap();
        let related = provider.embed("msi graphics").await.unwrap();
        let unrelated = provider.embed("zzzz qqqq").await.unwrap();
        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated)
        );
    }

    #[tokio::test]
    async fn scripted_responses_play_in_order() {
        let provider =
            MockTextProvider::with_responses(vec!["one".to_string(), "two".to_string()]);
        let options = GenerationOptions::default();
        assert_eq!(provider.generate("a", "", &options).await.unwrap(), "one");
        assert_eq!(provider.generate("b", "", &options).await.unwrap(), "two");
        // repeats the last response once the queue drains
        assert_eq!(provider.generate("c", "", &options).await.unwrap(), "two");
        assert_eq!(provider.prompts(), vec!["a", "b", "c"]);
    }
}
