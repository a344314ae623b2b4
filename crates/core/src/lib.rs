//! # Ragway Core
//!
//! Domain types, traits, and error definitions for the Ragway
//! retrieval-augmented assistant. This crate has **no I/O**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each external collaborator (generative model, embedding model, document
//! source) is a trait here. Concrete adapters live in their own crates, so:
//! - Adapters can be swapped via configuration
//! - Tests run against scripted mocks
//! - All crates depend inward on core

pub mod document;
pub mod embedding;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use document::{DocumentSource, Fragment, MetadataValue};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use message::{ConversationTurn, Message, Role, TurnRole};
pub use provider::{LanguageModel, Provider, ProviderModel, ProviderRequest, ProviderResponse};
