//! Retrieval augmentation: turns a query and the conversation window into
//! the prompt sent to the generative model.
//!
//! # Flow
//!
//! 1. Route the query ([`QueryRouter`])
//! 2. If stores were selected: embed the query once and search each
//!    selected store, concatenating matches in selection order
//! 3. Render system instructions, retrieved knowledge, memory and query
//!
//! Retrieval failures never abort the turn: the prompt is rendered without
//! a knowledge section and [`AugmentedPrompt::degraded`] records why.

use crate::prompt::{self, DEFAULT_SYSTEM_INSTRUCTIONS};
use crate::router::{QueryRouter, RouterDecision};
use ragway_core::embedding::Embedder;
use ragway_core::error::RetrievalError;
use ragway_core::message::ConversationTurn;
use ragway_core::provider::LanguageModel;
use ragway_memory::{ConversationMemory, ScoredMatch, StoreCatalog};
use std::sync::Arc;
use tracing::{debug, warn};

/// The rendered prompt plus everything that went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedPrompt {
    pub text: String,
    pub decision: RouterDecision,
    /// Matches rendered into the knowledge section, in prompt order.
    pub matches: Vec<ScoredMatch>,
    /// Set when stores were selected but retrieval failed.
    pub degraded: Option<String>,
}

impl AugmentedPrompt {
    pub fn has_context(&self) -> bool {
        !self.matches.is_empty()
    }
}

pub struct RetrievalAugmentor {
    router: QueryRouter,
    oracle: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    catalog: StoreCatalog,
    top_k: usize,
    min_score: f32,
    system_instructions: String,
}

impl RetrievalAugmentor {
    /// Defaults: `top_k` 3, `min_score` 0.5.
    pub fn new(
        router: QueryRouter,
        oracle: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        catalog: StoreCatalog,
    ) -> Self {
        Self {
            router,
            oracle,
            embedder,
            catalog,
            top_k: 3,
            min_score: 0.5,
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.into(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn catalog(&self) -> &StoreCatalog {
        &self.catalog
    }

    /// Route, retrieve and render in one step.
    pub async fn augment(&self, query: &str, memory: &ConversationMemory) -> AugmentedPrompt {
        let decision = self.route(query).await;
        let (matches, degraded) = self.retrieve_or_degrade(query, &decision).await;
        self.compose(query, &memory.snapshot(), decision, matches, degraded)
    }

    pub async fn route(&self, query: &str) -> RouterDecision {
        self.router.route(query, self.oracle.as_ref()).await
    }

    /// Search every selected store. An empty decision retrieves nothing and
    /// makes no embedding call.
    pub async fn retrieve(
        &self,
        query: &str,
        decision: &RouterDecision,
    ) -> Result<Vec<ScoredMatch>, RetrievalError> {
        if decision.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;

        let mut matches = Vec::new();
        for store_id in &decision.store_ids {
            let store = self
                .catalog
                .get(store_id)
                .ok_or_else(|| RetrievalError::UnknownStore(store_id.clone()))?;
            let found = store.search(&query_vector, self.top_k, self.min_score)?;
            debug!(store = %store_id, matches = found.len(), "Store searched");
            matches.extend(found);
        }
        Ok(matches)
    }

    /// [`Self::retrieve`], with failures logged and turned into a reason.
    pub async fn retrieve_or_degrade(
        &self,
        query: &str,
        decision: &RouterDecision,
    ) -> (Vec<ScoredMatch>, Option<String>) {
        match self.retrieve(query, decision).await {
            Ok(matches) => (matches, None),
            Err(e) => {
                warn!(error = %e, "RetrievalDegraded: answering without retrieved context");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }

    pub fn compose(
        &self,
        query: &str,
        memory: &[ConversationTurn],
        decision: RouterDecision,
        matches: Vec<ScoredMatch>,
        degraded: Option<String>,
    ) -> AugmentedPrompt {
        let text = prompt::render(&self.system_instructions, &matches, memory, query);
        AugmentedPrompt {
            text,
            decision,
            matches,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingEmbedder, KeywordEmbedder, ScriptedModel};
    use ragway_core::document::Fragment;
    use ragway_memory::{IndexEntry, StoreDescriptor, VectorStore};

    const VOCAB: [&str; 4] = ["rag", "retrieval", "pasta", "football"];

    async fn store(id: &str, texts: &[&str]) -> Arc<VectorStore> {
        let embedder = KeywordEmbedder::new(VOCAB.to_vec());
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_all(&owned).await.unwrap();

        let mut store = VectorStore::new(id);
        store
            .add(
                vectors
                    .into_iter()
                    .zip(texts)
                    .map(|(v, t)| IndexEntry::new(v, Fragment::new(*t, format!("{id}.txt"))))
                    .collect(),
            )
            .unwrap();
        Arc::new(store)
    }

    async fn catalog() -> StoreCatalog {
        let mut catalog = StoreCatalog::new();
        catalog
            .register(
                StoreDescriptor::new("rag", "RAG course"),
                store("rag", &["RAG means retrieval augmented generation.", "Retrieval uses embeddings."]).await,
            )
            .unwrap();
        catalog
            .register(
                StoreDescriptor::new("cooking", "Recipes"),
                store("cooking", &["Cook pasta in salted water."]).await,
            )
            .unwrap();
        catalog
    }

    fn augmentor(
        router: QueryRouter,
        oracle: Arc<ScriptedModel>,
        embedder: Arc<dyn Embedder>,
        catalog: StoreCatalog,
    ) -> RetrievalAugmentor {
        RetrievalAugmentor::new(router, oracle, embedder, catalog).with_system_instructions("SYS")
    }

    #[tokio::test]
    async fn routed_query_gets_context_block() {
        let oracle = Arc::new(ScriptedModel::new(["yes"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(KeywordEmbedder::new(VOCAB.to_vec())),
            catalog().await,
        );

        let prompt = aug.augment("What is RAG retrieval?", &ConversationMemory::new(10)).await;
        assert!(prompt.has_context());
        assert!(prompt.degraded.is_none());
        assert!(prompt.text.contains("RAG means retrieval augmented generation."));
        assert!(prompt.matches.iter().all(|m| m.store_id == "rag"));
        assert!(prompt.matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn unrouted_query_has_no_context_and_no_embedding_call() {
        let oracle = Arc::new(ScriptedModel::new(["no"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(FailingEmbedder),
            catalog().await,
        );

        let prompt = aug.augment("How tall is Everest?", &ConversationMemory::new(10)).await;
        assert!(prompt.decision.is_empty());
        assert!(!prompt.text.contains(prompt::KNOWLEDGE_HEADER));
        assert!(prompt.degraded.is_none());
    }

    #[tokio::test]
    async fn default_instructions_do_not_carry_the_knowledge_header() {
        let oracle = Arc::new(ScriptedModel::new(["no"]));
        let aug = RetrievalAugmentor::new(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(FailingEmbedder),
            catalog().await,
        );

        let prompt = aug.augment("How tall is Everest?", &ConversationMemory::new(10)).await;
        assert!(prompt.text.starts_with(DEFAULT_SYSTEM_INSTRUCTIONS));
        assert!(!prompt.text.contains(prompt::KNOWLEDGE_HEADER));
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_ungrounded_prompt() {
        let oracle = Arc::new(ScriptedModel::new(["yes"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(FailingEmbedder),
            catalog().await,
        );

        let prompt = aug.augment("What is RAG?", &ConversationMemory::new(10)).await;
        assert_eq!(prompt.decision.store_ids, vec!["rag"]);
        assert!(!prompt.has_context());
        assert!(prompt.degraded.unwrap().contains("unreachable"));
        assert!(!prompt.text.contains(prompt::KNOWLEDGE_HEADER));
    }

    #[tokio::test]
    async fn unknown_store_degrades() {
        let oracle = Arc::new(ScriptedModel::new(["yes"]));
        let aug = augmentor(
            QueryRouter::binary("missing", "RAG"),
            oracle,
            Arc::new(KeywordEmbedder::new(VOCAB.to_vec())),
            catalog().await,
        );

        let prompt = aug.augment("rag", &ConversationMemory::new(10)).await;
        assert!(prompt.degraded.unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn multi_store_matches_follow_selection_order() {
        let oracle = Arc::new(ScriptedModel::new(["cooking, rag"]));
        let catalog = catalog().await;
        let stores: Vec<StoreDescriptor> = catalog.descriptors().cloned().collect();
        let aug = augmentor(
            QueryRouter::multi_store(stores),
            oracle,
            Arc::new(KeywordEmbedder::new(VOCAB.to_vec())),
            catalog,
        )
        .with_min_score(0.0);

        let prompt = aug.augment("rag pasta", &ConversationMemory::new(10)).await;
        assert_eq!(prompt.decision.store_ids, vec!["rag", "cooking"]);
        let first_cooking = prompt.matches.iter().position(|m| m.store_id == "cooking").unwrap();
        assert!(prompt.matches[..first_cooking].iter().all(|m| m.store_id == "rag"));
    }

    #[tokio::test]
    async fn augment_is_idempotent() {
        let oracle = Arc::new(ScriptedModel::new(["yes", "yes"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(KeywordEmbedder::new(VOCAB.to_vec())),
            catalog().await,
        );
        let mut memory = ConversationMemory::new(10);
        memory.append(ConversationTurn::user("hi"));
        memory.append(ConversationTurn::assistant("hello"));

        let first = aug.augment("Explain retrieval", &memory).await;
        let second = aug.augment("Explain retrieval", &memory).await;
        assert_eq!(first, second);
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn top_k_bounds_each_store() {
        let oracle = Arc::new(ScriptedModel::new(["yes"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(KeywordEmbedder::new(VOCAB.to_vec())),
            catalog().await,
        )
        .with_top_k(1)
        .with_min_score(-1.0);

        let prompt = aug.augment("retrieval", &ConversationMemory::new(10)).await;
        assert_eq!(prompt.matches.len(), 1);
    }

    #[tokio::test]
    async fn memory_renders_before_query() {
        let oracle = Arc::new(ScriptedModel::new(["no"]));
        let aug = augmentor(
            QueryRouter::binary("rag", "RAG"),
            oracle,
            Arc::new(FailingEmbedder),
            catalog().await,
        );
        let mut memory = ConversationMemory::new(10);
        memory.append(ConversationTurn::user("My name is Ada."));

        let prompt = aug.augment("What is my name?", &memory).await;
        let remembered = prompt.text.find("User: My name is Ada.").unwrap();
        let question = prompt.text.find("What is my name?").unwrap();
        assert!(remembered < question);
    }
}
