//! Provider fallback: ordered chain with per-provider timeouts.
//!
//! When a provider fails (timeout, rate limit, error), the next provider in
//! the chain is tried. This is the only retry policy in Ragway; the
//! retrieval pipeline itself never retries.

use async_trait::async_trait;
use ragway_core::error::ProviderError;
use ragway_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

/// A single entry in the fallback chain.
struct FallbackEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl FallbackProvider {
    /// Create a new fallback provider with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a provider to the fallback chain with a custom timeout.
    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    /// Add a provider with the default timeout (120s).
    pub fn add_default(self, provider: Arc<dyn Provider>) -> Self {
        self.add(provider, Duration::from_secs(120))
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Run `call` against each provider in order until one succeeds.
    async fn run_chain<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, ProviderError>
    where
        F: Fn(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();

            info!(
                provider = %provider_name,
                operation,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, call(entry.provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!(
                        provider = %provider_name,
                        operation,
                        error = %e,
                        "Fallback: provider failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        operation,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.run_chain("complete", |provider| {
            let request = request.clone();
            async move { provider.complete(request).await }
        })
        .await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.run_chain("embed", |provider| {
            let request = request.clone();
            async move { provider.embed(request).await }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragway_core::message::Message;
    use std::sync::Mutex;

    /// A mock provider that fails every call with a fixed error.
    struct FailingProvider {
        name: String,
        error: ProviderError,
        call_count: Mutex<usize>,
    }

    impl FailingProvider {
        fn new(name: &str, error: ProviderError) -> Self {
            Self {
                name: name.into(),
                error,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }

        async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }
    }

    /// A mock provider that answers every call.
    struct SuccessProvider {
        name: String,
        call_count: Mutex<usize>,
    }

    impl SuccessProvider {
        fn new(name: &str) -> Self {
            Self {
                name: name.into(),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for SuccessProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Ok(ProviderResponse {
                message: Message::assistant(format!("answer from {}", self.name)),
                usage: None,
                model: "test-model".into(),
            })
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| vec![1.0, 0.0]).collect(),
                model: request.model,
                usage: None,
            })
        }
    }

    /// A mock provider that never answers.
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout("unreachable".into()))
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest {
            model: "test".into(),
            messages: vec![Message::user("What is RAG?")],
            temperature: 0.3,
            max_tokens: None,
            stop: vec![],
        }
    }

    #[tokio::test]
    async fn first_provider_succeeds() {
        let p1 = Arc::new(SuccessProvider::new("primary"));
        let p2 = Arc::new(SuccessProvider::new("secondary"));

        let fallback = FallbackProvider::new("chain")
            .add_default(p1.clone())
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "answer from primary");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_on_rate_limit() {
        let p1 = Arc::new(FailingProvider::new(
            "primary",
            ProviderError::RateLimited {
                retry_after_secs: 60,
            },
        ));
        let p2 = Arc::new(SuccessProvider::new("secondary"));

        let fallback = FallbackProvider::new("chain")
            .add_default(p1.clone())
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "answer from secondary");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn embeddings_fall_back_too() {
        let p1 = Arc::new(FailingProvider::new(
            "primary",
            ProviderError::Network("conn refused".into()),
        ));
        let p2 = Arc::new(SuccessProvider::new("secondary"));

        let fallback = FallbackProvider::new("chain")
            .add_default(p1.clone())
            .add_default(p2.clone());

        let response = fallback
            .embed(EmbeddingRequest {
                model: "text-embedding-004".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test]
    async fn all_providers_fail_with_last_error() {
        let p1 = Arc::new(FailingProvider::new(
            "primary",
            ProviderError::Network("conn refused".into()),
        ));
        let p2 = Arc::new(FailingProvider::new(
            "secondary",
            ProviderError::AuthenticationFailed("bad key".into()),
        ));

        let fallback = FallbackProvider::new("chain")
            .add_default(p1.clone())
            .add_default(p2.clone());

        match fallback.complete(test_request()).await.unwrap_err() {
            ProviderError::AuthenticationFailed(_) => {}
            other => panic!("Expected AuthenticationFailed, got: {other:?}"),
        }
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_fallback() {
        let p2 = Arc::new(SuccessProvider::new("secondary"));

        let fallback = FallbackProvider::new("chain")
            .add(Arc::new(HangingProvider), Duration::from_millis(50))
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "answer from secondary");
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn empty_chain_returns_not_configured() {
        let fallback = FallbackProvider::new("empty");
        assert!(fallback.is_empty());
        assert!(matches!(
            fallback.complete(test_request()).await,
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn health_check_any_healthy() {
        let fallback = FallbackProvider::new("chain")
            .add_default(Arc::new(FailingProvider::new(
                "bad",
                ProviderError::Network("down".into()),
            )))
            .add_default(Arc::new(SuccessProvider::new("good")));

        assert_eq!(fallback.len(), 2);
        assert!(fallback.health_check().await.unwrap());
    }
}
