//! Provider-backed embedder.
//!
//! Adapts any [`Provider`] with an embeddings endpoint to the [`Embedder`]
//! contract: one vector per input, in input order, constant dimensionality.

use async_trait::async_trait;
use ragway_core::error::ProviderError;
use ragway_core::provider::{EmbeddingRequest, Provider};
use ragway_core::Embedder;
use std::sync::Arc;
use tracing::debug;

/// Inputs sent per embeddings request.
const DEFAULT_BATCH_SIZE: usize = 64;

pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    label: String,
    batch_size: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let label = format!("{}/{}", provider.name(), model);
        Self {
            provider,
            model,
            label,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the number of texts sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                })
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(ProviderError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    actual: response.embeddings.len(),
                });
            }

            debug!(embedder = %self.label, count = batch.len(), "Embedded batch");
            vectors.extend(response.embeddings);
        }

        Ok(vectors)
    }
}
