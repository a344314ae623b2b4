//! Error types for the Ragway domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! is what a conversation turn returns.

use std::path::PathBuf;
use thiserror::Error;

/// The error a turn of the assistant can surface to its caller. Routing and
/// retrieval failures are recovered inside the turn and never reach it.
#[derive(Debug, Error)]
pub enum Error {
    /// The final answer could not be generated. Fatal for the current turn only.
    #[error("Generation failed: {0}")]
    Generation(#[source] ProviderError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding count mismatch: sent {expected} inputs, got {actual} vectors")]
    EmbeddingCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Dimension mismatch in store '{store}': expected {expected}, got {actual}")]
    DimensionMismatch {
        store: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty embedding vector in store '{store}'")]
    EmptyVector { store: String },

    #[error("Store '{store}' is already registered")]
    DuplicateStore { store: String },
}

/// Failures while building a store from a document source.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Unsupported document at {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("Invalid chunking parameters: {0}")]
    Chunking(String),

    #[error("Embedding failed during ingestion: {0}")]
    Embedding(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why retrieval was skipped for a routed query. Always recovered locally by
/// falling back to an ungrounded prompt.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("Search failed: {0}")]
    Search(#[from] StoreError),

    #[error("Router selected unknown store '{0}'")]
    UnknownStore(String),
}

/// Why a router could not turn the oracle's answer into a decision.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    #[error("Classification call failed: {0}")]
    Oracle(#[from] ProviderError),

    #[error("Router could not parse classification response: {response:?}")]
    Unparseable { response: String },
}
