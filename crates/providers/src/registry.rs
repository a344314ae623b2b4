//! Provider registry: builds and looks up LLM providers from config.
//!
//! Handles provider creation, the optional fallback chain, and the
//! embedder that ingestion and retrieval share.

use crate::embedder::ProviderEmbedder;
use crate::fallback::FallbackProvider;
use crate::openai_compat::{GEMINI_BASE_URL, OpenAiCompatProvider};
use ragway_config::AppConfig;
use ragway_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Holds every configured provider by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRegistry {
    /// Create an empty registry with a default provider name.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build every provider named in `config`, plus the default one.
pub fn build_from_config(config: &AppConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(&config.default_provider);

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.extend(config.fallback_providers.iter());
    names.push(&config.default_provider);
    if let Some(name) = &config.embedding.provider {
        names.push(name);
    }

    for name in names {
        if registry.get(name).is_none() {
            registry.register(name.clone(), build_provider(config, name));
        }
    }

    registry
}

fn build_provider(config: &AppConfig, name: &str) -> Arc<dyn Provider> {
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
}

/// The provider used for chat: the default provider, wrapped in a fallback
/// chain when `fallback_providers` is configured.
pub fn chat_provider(config: &AppConfig, registry: &ProviderRegistry) -> Option<Arc<dyn Provider>> {
    let primary = registry.default_provider()?;
    if config.fallback_providers.is_empty() {
        return Some(primary);
    }

    let timeout_for = |name: &str| {
        Duration::from_secs(
            config
                .providers
                .get(name)
                .map(|p| p.timeout_secs)
                .unwrap_or(120),
        )
    };

    let mut chain = FallbackProvider::new(format!("{}+fallback", config.default_provider))
        .add(primary, timeout_for(&config.default_provider));
    for name in &config.fallback_providers {
        if let Some(provider) = registry.get(name) {
            chain = chain.add(provider, timeout_for(name));
        }
    }

    Some(Arc::new(chain))
}

/// The embedder configured under `[embedding]`.
pub fn embedder_from_config(
    config: &AppConfig,
    registry: &ProviderRegistry,
) -> Option<ProviderEmbedder> {
    let provider = match &config.embedding.provider {
        Some(name) => registry.get(name)?,
        None => registry.default_provider()?,
    };
    Some(ProviderEmbedder::new(provider, &config.embedding.model))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" => GEMINI_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
