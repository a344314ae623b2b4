//! In-memory similarity-search store.
//!
//! A [`VectorStore`] is built once during ingestion and then shared
//! read-only (`Arc<VectorStore>`) for the rest of the process. Entries are
//! append-only; search is an exhaustive cosine scan.

use crate::vector::{by_score_desc, cosine_similarity};
use ragway_core::document::Fragment;
use ragway_core::error::StoreError;
use std::sync::Arc;
use tracing::debug;

/// An embedding paired with the fragment it was computed from.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    embedding: Vec<f32>,
    fragment: Arc<Fragment>,
}

impl IndexEntry {
    pub fn new(embedding: Vec<f32>, fragment: Fragment) -> Self {
        Self {
            embedding,
            fragment: Arc::new(fragment),
        }
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }
}

/// A fragment returned by [`VectorStore::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub fragment: Arc<Fragment>,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// The store this match came from.
    pub store_id: String,
}

#[derive(Debug)]
pub struct VectorStore {
    id: String,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dimension: None,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Vector length shared by every entry; `None` until the first non-empty add.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append a batch of entries.
    ///
    /// The whole batch is validated first: if any vector is empty or its
    /// length disagrees with the store (or with the first vector of the
    /// batch, for a fresh store), nothing is appended.
    pub fn add(&mut self, batch: Vec<IndexEntry>) -> Result<(), StoreError> {
        let Some(first) = batch.first() else {
            return Ok(());
        };
        let expected = self.dimension.unwrap_or(first.embedding.len());

        for entry in &batch {
            if entry.embedding.is_empty() {
                return Err(StoreError::EmptyVector {
                    store: self.id.clone(),
                });
            }
            if entry.embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    store: self.id.clone(),
                    expected,
                    actual: entry.embedding.len(),
                });
            }
        }

        self.dimension = Some(expected);
        self.entries.extend(batch);
        debug!(store = %self.id, total = self.entries.len(), "Entries added");
        Ok(())
    }

    /// Rank every entry by cosine similarity to `query`.
    ///
    /// Matches scoring below `min_score` are dropped; at most `top_k` are
    /// returned, best first. Equal scores keep insertion order.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredMatch>, StoreError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                store: self.id.clone(),
                expected: dimension,
                actual: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&entry.embedding, query), entry))
            .filter(|(score, _)| *score >= min_score)
            .collect();

        // `sort_by` is stable: earlier entries win ties.
        scored.sort_by(|a, b| by_score_desc(a.0, b.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| ScoredMatch {
                fragment: Arc::clone(&entry.fragment),
                score,
                store_id: self.id.clone(),
            })
            .collect())
    }
}
