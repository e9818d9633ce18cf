//! k-d tree index module.

pub mod tree;

pub use tree::KdTree;

use std::collections::BTreeMap;

use tracing::debug;

use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::{check_dimension, Index};
use crate::item::{Filter, IndexKey};

/// An exact nearest-neighbor index backed by a balanced k-d tree.
///
/// `build` rebuilds the tree wholesale from the working set. Between builds,
/// `add` and `remove` update the tree in place without rebalancing.
#[derive(Debug)]
pub struct KdTreeIndex {
    keys: BTreeMap<usize, IndexKey>,
    tree: KdTree,
    metric: DistanceMetric,
    dimension: Option<usize>,
}

impl KdTreeIndex {
    /// Create a new empty k-d tree index with the given distance metric.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            keys: BTreeMap::new(),
            tree: KdTree::new(1),
            metric,
            dimension: None,
        }
    }

    /// Add a batch of keys, then rebuild the tree balanced.
    ///
    /// Stops at the first key whose dimension disagrees with the index.
    pub fn build_batch(&mut self, keys: Vec<IndexKey>) -> Result<()> {
        for key in keys {
            self.add(key)?;
        }
        self.build()
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }
}

impl Index for KdTreeIndex {
    fn add(&mut self, key: IndexKey) -> Result<()> {
        let dim = key.vector.dimension();
        match self.dimension {
            Some(expected) if expected != dim => {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            Some(_) => {}
            None => {
                self.dimension = Some(dim);
                self.tree = KdTree::new(dim);
            }
        }

        if let Some(old) = self.keys.insert(key.id, key.clone()) {
            self.tree.remove(old.id, old.vector.as_slice());
        }
        self.tree.insert(key);
        Ok(())
    }

    fn remove(&mut self, id: usize) {
        if let Some(old) = self.keys.remove(&id) {
            self.tree.remove(id, old.vector.as_slice());
        }
        if self.keys.is_empty() {
            self.dimension = None;
        }
    }

    fn build(&mut self) -> Result<()> {
        let dimension = self.dimension.unwrap_or(1);
        self.tree = KdTree::build(self.keys.values().cloned().collect(), dimension);
        debug!(
            items = self.tree.len(),
            height = self.tree.height(),
            "built k-d tree"
        );
        Ok(())
    }

    fn search(
        &self,
        query: &[f64],
        k: usize,
        max_distance: Option<f64>,
        filter: Option<&Filter>,
    ) -> Result<Vec<(usize, f64)>> {
        check_dimension(self.dimension, query)?;
        let results = self
            .tree
            .nearest(query, k, self.metric, max_distance, filter)?;
        Ok(results.into_iter().map(|n| (n.id, n.distance)).collect())
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}
