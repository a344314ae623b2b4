//! The set of built stores, in registration order, with their descriptions.

use crate::store::VectorStore;
use ragway_core::error::StoreError;
use std::sync::Arc;

/// A store id plus the natural-language description the multi-store router
/// shows to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDescriptor {
    pub id: String,
    pub description: String,
}

impl StoreDescriptor {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Read-only after startup; cloning shares the underlying stores.
#[derive(Debug, Clone, Default)]
pub struct StoreCatalog {
    entries: Vec<(StoreDescriptor, Arc<VectorStore>)>,
}

impl StoreCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under its descriptor. Ids are unique.
    pub fn register(
        &mut self,
        descriptor: StoreDescriptor,
        store: Arc<VectorStore>,
    ) -> Result<(), StoreError> {
        if self.get(&descriptor.id).is_some() {
            return Err(StoreError::DuplicateStore {
                store: descriptor.id,
            });
        }
        self.entries.push((descriptor, store));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<VectorStore>> {
        self.entries
            .iter()
            .find(|(d, _)| d.id == id)
            .map(|(_, store)| store)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &StoreDescriptor> {
        self.entries.iter().map(|(d, _)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
