//! Named collections.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::info;

use crate::collection::Collection;
use crate::config::CollectionConfig;
use crate::error::Result;

/// A catalog mapping collection names to collections.
#[derive(Debug, Default)]
pub struct Database {
    collections: BTreeMap<String, Collection>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection, replacing any existing collection of that name.
    pub fn create_collection(
        &mut self,
        name: impl Into<String>,
        config: CollectionConfig,
    ) -> Result<&mut Collection> {
        let name = name.into();
        let collection = Collection::new(name.clone(), config)?;
        match self.collections.entry(name) {
            Entry::Occupied(mut entry) => {
                info!(collection = %entry.key(), "replaced collection");
                entry.insert(collection);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                info!(collection = %entry.key(), "created collection");
                Ok(entry.insert(collection))
            }
        }
    }

    pub fn get_collection(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// Get a collection, creating it with `config` if it does not exist.
    /// An existing collection keeps its own configuration.
    pub fn get_or_create_collection(
        &mut self,
        name: &str,
        config: CollectionConfig,
    ) -> Result<&mut Collection> {
        match self.collections.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let collection = Collection::new(name, config)?;
                info!(collection = %name, "created collection");
                Ok(entry.insert(collection))
            }
        }
    }

    /// Drop a collection, returning it if it existed.
    pub fn delete_collection(&mut self, name: &str) -> Option<Collection> {
        let removed = self.collections.remove(name);
        if removed.is_some() {
            info!(collection = %name, "deleted collection");
        }
        removed
    }

    /// Collection names in sorted order.
    pub fn list_collections(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Drop every collection.
    pub fn reset(&mut self) {
        info!(collections = self.collections.len(), "reset database");
        self.collections.clear();
    }
}
