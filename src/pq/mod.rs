//! Product-quantized k-d tree index module.
//!
//! Approximate: a query is answered from the bucket of the single quantized
//! node closest to the quantized query, trading recall for sub-linear cost.

pub mod kmeans;
pub mod quantizer;

pub use kmeans::{Clustering, KMeans};
pub use quantizer::{ProductQuantizer, QuantizedTree};

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::config::PqParams;
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::{check_dimension, Index};
use crate::item::{matches_filter, Filter, IndexKey};

/// An approximate index over product-quantized vectors.
#[derive(Debug)]
pub struct KdTreePqIndex {
    keys: BTreeMap<usize, IndexKey>,
    params: PqParams,
    metric: DistanceMetric,
    dimension: Option<usize>,
    /// Every build reseeds from this value, so rebuilding an unchanged
    /// working set reproduces the same codebooks.
    seed: u64,
    quantizer: Option<ProductQuantizer>,
    tree: QuantizedTree,
}

impl KdTreePqIndex {
    /// Create a new PQ index with the given metric and default parameters.
    pub fn new(metric: DistanceMetric) -> Self {
        Self::with_params(metric, PqParams::default())
    }

    /// Create a new PQ index with custom parameters.
    pub fn with_params(metric: DistanceMetric, params: PqParams) -> Self {
        let seed = params
            .seed
            .unwrap_or_else(|| StdRng::from_entropy().gen());
        Self {
            keys: BTreeMap::new(),
            params,
            metric,
            dimension: None,
            seed,
            quantizer: None,
            tree: QuantizedTree::default(),
        }
    }

    pub fn params(&self) -> &PqParams {
        &self.params
    }

    /// The quantizer trained by the last `build`, if the working set was not empty.
    pub fn quantizer(&self) -> Option<&ProductQuantizer> {
        self.quantizer.as_ref()
    }

    /// Number of distinct quantized vectors in the tree.
    pub fn num_nodes(&self) -> usize {
        self.tree.len()
    }
}

impl Index for KdTreePqIndex {
    fn add(&mut self, key: IndexKey) -> Result<()> {
        let dim = key.vector.dimension();
        match self.dimension {
            Some(expected) if expected != dim => {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            _ => self.dimension = Some(dim),
        }
        self.keys.insert(key.id, key);
        Ok(())
    }

    fn remove(&mut self, id: usize) {
        self.keys.remove(&id);
        if self.keys.is_empty() {
            self.dimension = None;
        }
    }

    fn build(&mut self) -> Result<()> {
        if self.keys.is_empty() {
            self.quantizer = None;
            self.tree = QuantizedTree::default();
            return Ok(());
        }

        if self.params.num_centroids > self.keys.len() {
            warn!(
                num_centroids = self.params.num_centroids,
                items = self.keys.len(),
                "fewer items than PQ centroids; using one centroid per item"
            );
        }

        let vectors: Vec<&[f64]> = self.keys.values().map(|k| k.vector.as_slice()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let quantizer = ProductQuantizer::train(&vectors, &self.params, self.metric, &mut rng)?;

        let mut buckets: BTreeMap<Vec<usize>, Vec<usize>> = BTreeMap::new();
        for key in self.keys.values() {
            let code = quantizer.encode(key.vector.as_slice())?;
            buckets.entry(code).or_default().push(key.id);
        }
        let entries: Vec<(Vec<f64>, Vec<usize>)> = buckets
            .into_iter()
            .map(|(code, ids)| (quantizer.decode(&code), ids))
            .collect();

        self.tree = QuantizedTree::build(entries);
        debug!(
            items = self.keys.len(),
            nodes = self.tree.len(),
            subvectors = quantizer.num_subvectors(),
            "built product-quantized k-d tree"
        );
        self.quantizer = Some(quantizer);
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
        let Some(quantizer) = &self.quantizer else {
            return Ok(Vec::new());
        };

        let quantized = quantizer.quantize(query)?;
        let Some((bucket, node_distance)) = self.tree.nearest(&quantized, self.metric)? else {
            return Ok(Vec::new());
        };
        trace!(bucket = bucket.len(), node_distance, "nearest quantized node");

        let mut results = Vec::with_capacity(bucket.len());
        for id in bucket {
            // Removed since the last build.
            let Some(key) = self.keys.get(id) else {
                continue;
            };
            if !matches_filter(filter, &key.metadata) {
                continue;
            }
            let distance = self.metric.distance(query, key.vector.as_slice())?;
            if max_distance.map_or(true, |max| distance <= max) {
                results.push((*id, distance));
            }
        }

        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(k);
        Ok(results)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}
