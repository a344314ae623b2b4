//! Shared test helpers: scripted language model and deterministic embedders.

use async_trait::async_trait;
use ragway_core::embedding::Embedder;
use ragway_core::error::ProviderError;
use ragway_core::provider::LanguageModel;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A language model that returns scripted results in order and records
/// every prompt it receives.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedModel {
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<const N: usize>(responses: [&str; N]) -> Self {
        Self::from_results(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn from_results(results: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        let call = prompts.len();

        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedModel: no more results (call #{call})"))
    }
}

/// Embeds text as keyword counts over a fixed vocabulary, plus a small bias
/// so no vector is all zeros.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: Vec<&'static str>) -> Self {
        Self { vocabulary }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f32> = self
                    .vocabulary
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect();
                vector.push(0.01);
                vector
            })
            .collect())
    }
}

/// An embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed_all(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Network("embedding service unreachable".into()))
    }
}
