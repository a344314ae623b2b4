//! LLM and embedding provider implementations for Ragway.
//!
//! All chat backends implement `ragway_core::Provider`; embeddings are
//! exposed through `ragway_core::Embedder`. The registry builds both from
//! configuration.

pub mod embedder;
pub mod fallback;
pub mod openai_compat;
pub mod registry;

pub use embedder::ProviderEmbedder;
pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{ProviderRegistry, build_from_config, chat_provider, embedder_from_config};
