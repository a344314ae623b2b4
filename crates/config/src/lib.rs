//! Configuration loading, validation, and management for Ragway.
//!
//! Loads configuration from `~/.ragway/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Environment variables checked for the API key, highest priority first.
pub const API_KEY_ENV_VARS: &[&str] = &[
    "RAGWAY_API_KEY",
    "GEMINI_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
];

/// The root configuration structure.
///
/// Maps directly to `~/.ragway/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for every model call
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Providers tried, in order, after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Similarity search settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Document splitting settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Query routing settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Interactive session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Knowledge sources, one vector store each
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("fallback_providers", &self.fallback_providers)
            .field("embedding", &self.embedding)
            .field("retrieval", &self.retrieval)
            .field("memory", &self.memory)
            .field("ingestion", &self.ingestion)
            .field("router", &self.router)
            .field("session", &self.session)
            .field("providers", &self.providers)
            .field("sources", &self.sources)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Per-request timeout used by the fallback chain
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider used for embeddings; `None` = the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_model() -> String {
    "text-embedding-004".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum matches taken from each selected store
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Matches scoring below this are discarded
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_top_k() -> usize {
    3
}
fn default_min_score() -> f32 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of turns remembered (user and assistant turns count separately)
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum characters per segment
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive segments
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    300
}
fn default_chunk_overlap() -> usize {
    30
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Which routing strategy the assistant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    /// One store; the model answers yes / no / maybe.
    #[default]
    Binary,
    /// Several described stores; the model names the relevant ones.
    Multi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub mode: RouterMode,

    /// Subject matter of the single store, used in the binary prompt
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Whole words that make the binary router skip retrieval
    #[serde(default = "default_negative_markers")]
    pub negative_markers: Vec<String>,
}

fn default_domain() -> String {
    "AI, RAG (Retrieval-Augmented Generation) or fine-tuning".into()
}
fn default_negative_markers() -> Vec<String> {
    vec!["no".into(), "non".into()]
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: RouterMode::default(),
            domain: default_domain(),
            negative_markers: default_negative_markers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Input that ends an interactive session (case-insensitive)
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

fn default_sentinel() -> String {
    "bye".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
        }
    }
}

/// A knowledge source: one document, one vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Store identifier, as the router names it
    pub id: String,

    /// Path of the document to ingest
    pub path: PathBuf,

    /// What the document is about (shown to the multi-store router)
    #[serde(default)]
    pub description: String,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragway/config.toml).
    ///
    /// Environment variables override the file; see [`API_KEY_ENV_VARS`],
    /// `RAGWAY_PROVIDER` and `RAGWAY_MODEL`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&Self::config_dir().join("config.toml"))
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Relative source paths are relative to the config file.
        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                if source.path.is_relative() {
                    source.path = base.join(&source.path);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = API_KEY_ENV_VARS
                .iter()
                .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()));
        }

        if let Some(provider) = lookup("RAGWAY_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("RAGWAY_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragway")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(ConfigError::ValidationError(
                "retrieval.min_score must be between -1.0 and 1.0".into(),
            ));
        }

        if self.memory.window == 0 {
            return Err(ConfigError::ValidationError(
                "memory.window must be at least 1".into(),
            ));
        }

        if self.ingestion.chunk_size == 0
            || self.ingestion.chunk_overlap >= self.ingestion.chunk_size
        {
            return Err(ConfigError::ValidationError(
                "ingestion.chunk_overlap must be smaller than a non-zero ingestion.chunk_size"
                    .into(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::ValidationError("source id must not be empty".into()));
            }
            if !seen.insert(source.id.to_lowercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }

        if self.router.mode == RouterMode::Binary && self.sources.len() > 1 {
            return Err(ConfigError::ValidationError(format!(
                "binary router takes exactly one source, {} configured; use router.mode = \"multi\"",
                self.sources.len()
            )));
        }

        if self.router.mode == RouterMode::Multi && self.sources.is_empty() {
            return Err(ConfigError::ValidationError(
                "multi router needs at least one [[sources]] entry".into(),
            ));
        }

        Ok(())
    }

    /// The API key, or the fatal startup error when none was configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential {
                env_vars: API_KEY_ENV_VARS.join(", "),
            })
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            fallback_providers: vec![],
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            memory: MemoryConfig::default(),
            ingestion: IngestionConfig::default(),
            router: RouterConfig::default(),
            session: SessionConfig::default(),
            providers: HashMap::new(),
            sources: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured; set one of {env_vars} or api_key in config.toml")]
    MissingCredential { env_vars: String },
}
