//! Embedder trait: turns text into fixed-length vectors.

use crate::error::ProviderError;
use async_trait::async_trait;

/// The embedding collaborator.
///
/// `embed_all` must return exactly one vector per input, in input order, and
/// every vector produced by one instance must have the same length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name (e.g., "gemini/text-embedding-004").
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_all(&[text.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            actual => Err(ProviderError::EmbeddingCountMismatch { expected: 1, actual }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }

        async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct SilentEmbedder;

    #[async_trait]
    impl Embedder for SilentEmbedder {
        fn name(&self) -> &str {
            "silent"
        }

        async fn embed_all(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn embed_delegates_to_batch() {
        let v = LengthEmbedder.embed("abcd").await.unwrap();
        assert_eq!(v, vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn embed_rejects_wrong_vector_count() {
        let err = SilentEmbedder.embed("abcd").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::EmbeddingCountMismatch { expected: 1, actual: 0 }
        ));
    }
}
