//! Retrieval memory for Ragway: the vector store, the store catalog,
//! conversation memory and document ingestion.

pub mod catalog;
pub mod conversation;
pub mod ingest;
pub mod store;
pub mod vector;

pub use catalog::{StoreCatalog, StoreDescriptor};
pub use conversation::ConversationMemory;
pub use ingest::{DocumentReport, FileSource, IngestReport, build_store, collect_origins};
pub use store::{IndexEntry, ScoredMatch, VectorStore};
pub use vector::cosine_similarity;
