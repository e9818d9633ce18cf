//! In-memory item store with a set of synchronized search indexes

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::CollectionConfig;
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::{AnyIndex, Index, IndexType};
use crate::item::{matches_filter, Filter, IndexKey, Item, Metadata};
use crate::vector::Vector;

/// A search result: the matched item and its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub item: Item,
    pub distance: f64,
}

/// Options for [`Collection::query_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub n_results: usize,
    /// Drop matches farther than this.
    pub max_distance: Option<f64>,
    pub filter: Option<Filter>,
    /// Index to query; the first configured one when unset.
    pub index: Option<IndexType>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            n_results: 1,
            max_distance: None,
            filter: None,
            index: None,
        }
    }
}

impl QueryOptions {
    pub fn new(n_results: usize) -> Self {
        Self {
            n_results,
            ..Self::default()
        }
    }

    pub fn max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn index(mut self, index: IndexType) -> Self {
        self.index = Some(index);
        self
    }
}

/// A named set of items and the indexes configured over them.
///
/// Items are addressed by their String id; every configured index sees a
/// `usize` internal id assigned in insertion order. Mutations fan out to all
/// indexes immediately, and every query rebuilds the index it targets first.
#[derive(Debug)]
pub struct Collection {
    name: String,
    config: CollectionConfig,
    /// String ID -> internal ID
    id_to_internal: HashMap<String, usize>,
    /// Items keyed by internal ID, so iteration follows insertion order
    items: BTreeMap<usize, Item>,
    indexes: BTreeMap<IndexType, AnyIndex>,
    next_id: usize,
    /// Fixed by the first item; cleared when the collection empties
    dimension: Option<usize>,
}

impl Collection {
    /// Create an empty collection. Fails if the configuration is invalid.
    pub fn new(name: impl Into<String>, config: CollectionConfig) -> Result<Self> {
        config.validate()?;
        let indexes = Self::create_indexes(&config);
        Ok(Self {
            name: name.into(),
            config,
            id_to_internal: HashMap::new(),
            items: BTreeMap::new(),
            indexes,
            next_id: 0,
            dimension: None,
        })
    }

    fn create_indexes(config: &CollectionConfig) -> BTreeMap<IndexType, AnyIndex> {
        config
            .indexes
            .iter()
            .map(|&index_type| (index_type, AnyIndex::new(index_type, config)))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// The vector dimension, once the first item has been added.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The configured index types, in selector order.
    pub fn index_types(&self) -> impl Iterator<Item = IndexType> + '_ {
        self.indexes.keys().copied()
    }

    /// Number of stored items.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, overwriting any item with the same id.
    ///
    /// An overwrite keeps the item's position in insertion order.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        vector: impl Into<Vector>,
        metadata: Metadata,
        document: impl Into<String>,
    ) -> Result<()> {
        let item = Item::new(id, vector, metadata, document);
        let dim = item.vector.dimension();
        if dim == 0 {
            return Err(VectorDbError::InvalidVector {
                reason: format!("item {} has an empty vector", item.id),
            });
        }

        match self.dimension {
            Some(expected) if expected != dim => {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            _ => {}
        }

        let internal_id = match self.id_to_internal.get(&item.id) {
            Some(&existing) => existing,
            None => {
                let internal_id = self.next_id;
                self.next_id += 1;
                internal_id
            }
        };

        let key = IndexKey::from_item(internal_id, &item);
        for index in self.indexes.values_mut() {
            index.add(key.clone())?;
        }

        self.dimension = Some(dim);
        self.id_to_internal.insert(item.id.clone(), internal_id);
        self.items.insert(internal_id, item);
        Ok(())
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.id_to_internal
            .get(id)
            .and_then(|internal_id| self.items.get(internal_id))
    }

    /// Like [`get`](Self::get), but absence is a `NotFound` error.
    pub fn try_get(&self, id: &str) -> Result<&Item> {
        self.get(id).ok_or_else(|| VectorDbError::NotFound { id: id.to_string() })
    }

    /// The first `n` items in insertion order.
    pub fn peek(&self, n: usize) -> Vec<&Item> {
        self.items.values().take(n).collect()
    }

    /// Remove an item from the store and from every index.
    pub fn delete(&mut self, id: &str) -> Option<Item> {
        let internal_id = self.id_to_internal.remove(id)?;
        for index in self.indexes.values_mut() {
            index.remove(internal_id);
        }
        let item = self.items.remove(&internal_id);
        if self.items.is_empty() {
            self.dimension = None;
        }
        item
    }

    /// Remove every item and recreate all configured indexes empty.
    pub fn reset(&mut self) {
        self.id_to_internal.clear();
        self.items.clear();
        self.indexes = Self::create_indexes(&self.config);
        self.dimension = None;
        debug!(collection = %self.name, "reset collection");
    }

    /// Run one k-NN search per query vector against the chosen index.
    ///
    /// Returns one result list per query vector, in input order.
    pub fn query(
        &mut self,
        query_vectors: &[Vec<f64>],
        n_results: usize,
        filter: Option<&Filter>,
        index: Option<IndexType>,
    ) -> Result<Vec<Vec<SearchResult>>> {
        let options = QueryOptions {
            n_results,
            max_distance: None,
            filter: filter.cloned(),
            index,
        };
        self.query_with(query_vectors, &options)
    }

    /// [`query`](Self::query) with a distance ceiling and the other options.
    pub fn query_with(
        &mut self,
        query_vectors: &[Vec<f64>],
        options: &QueryOptions,
    ) -> Result<Vec<Vec<SearchResult>>> {
        let index_type = self.resolve_index(options.index)?;
        let index = self
            .indexes
            .get_mut(&index_type)
            .ok_or(VectorDbError::UnsupportedIndex { index: index_type })?;
        index.build()?;

        if let Some(expected) = self.dimension {
            if let Some(bad) = query_vectors.iter().find(|q| q.len() != expected) {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }

        let index = &self.indexes[&index_type];
        let filter = options.filter.as_ref();
        let hits = query_vectors
            .par_iter()
            .map(|query| index.search(query, options.n_results, options.max_distance, filter))
            .collect::<Result<Vec<_>>>()?;

        trace!(
            collection = %self.name,
            index = %index_type,
            queries = query_vectors.len(),
            "query finished"
        );
        Ok(hits.into_iter().map(|hits| self.resolve(hits)).collect())
    }

    /// Exact k-NN over the whole store under an explicitly chosen metric,
    /// independent of the configured indexes.
    pub fn nearest_neighbors(
        &self,
        vector: &[f64],
        k: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<SearchResult>> {
        let mut hits = Vec::with_capacity(self.items.len());
        for (&internal_id, item) in &self.items {
            hits.push((internal_id, metric.distance(vector, item.vector.as_slice())?));
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(self.resolve(hits))
    }

    /// Exact scan with the collection metric, without touching any index.
    pub fn scan(&self, vector: &[f64], k: usize, filter: Option<&Filter>) -> Result<Vec<SearchResult>> {
        let mut hits = Vec::new();
        for (&internal_id, item) in &self.items {
            if matches_filter(filter, &item.metadata) {
                hits.push((internal_id, self.metric().distance(vector, item.vector.as_slice())?));
            }
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(self.resolve(hits))
    }

    /// Distance between two vectors under the given metric.
    pub fn distance(&self, a: &[f64], b: &[f64], metric: DistanceMetric) -> Result<f64> {
        metric.distance(a, b)
    }

    fn resolve_index(&self, requested: Option<IndexType>) -> Result<IndexType> {
        match requested {
            Some(index) if self.indexes.contains_key(&index) => Ok(index),
            Some(index) => Err(VectorDbError::UnsupportedIndex { index }),
            None => self
                .config
                .indexes
                .first()
                .copied()
                .ok_or_else(|| {
                    VectorDbError::InvalidParameter("collection has no configured index".to_string())
                }),
        }
    }

    /// Map internal ids to items, dropping ids no longer in the store.
    fn resolve(&self, hits: Vec<(usize, f64)>) -> Vec<SearchResult> {
        hits.into_iter()
            .filter_map(|(internal_id, distance)| {
                self.items.get(&internal_id).map(|item| SearchResult {
                    item: item.clone(),
                    distance,
                })
            })
            .collect()
    }
}
