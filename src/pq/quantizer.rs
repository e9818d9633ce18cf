//! Product quantizer and the k-d tree built over quantized vectors.

use std::ops::Range;

use rand::rngs::StdRng;

use crate::config::PqParams;
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::neighbor_queue::{MinHeap, Neighbor};

use super::kmeans::{nearest_centroid, KMeans};

/// Splits vectors into contiguous chunks and replaces every chunk with its
/// nearest codebook centroid.
#[derive(Debug, Clone)]
pub struct ProductQuantizer {
    dimension: usize,
    chunks: Vec<Range<usize>>,
    /// One codebook per chunk.
    codebooks: Vec<Vec<Vec<f64>>>,
    metric: DistanceMetric,
}

impl ProductQuantizer {
    /// Train one codebook per chunk with k-means over all vectors' chunks.
    ///
    /// `num_subvectors` is capped at the dimension; when the dimension does
    /// not divide evenly the chunks differ in size by at most one.
    pub fn train(
        vectors: &[&[f64]],
        params: &PqParams,
        metric: DistanceMetric,
        rng: &mut StdRng,
    ) -> Result<Self> {
        params.validate()?;
        let dimension = vectors.first().map_or(0, |v| v.len());
        if dimension == 0 {
            return Err(VectorDbError::InvalidVector {
                reason: "cannot quantize empty vectors".to_string(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorDbError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let chunks = chunk_ranges(dimension, params.num_subvectors);
        let kmeans = KMeans::new(params.num_centroids, params.max_iterations, metric)?;

        let mut codebooks = Vec::with_capacity(chunks.len());
        for range in &chunks {
            let sub: Vec<&[f64]> = vectors.iter().map(|v| &v[range.clone()]).collect();
            codebooks.push(kmeans.fit(&sub, rng)?.centroids);
        }

        Ok(Self {
            dimension,
            chunks,
            codebooks,
            metric,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_subvectors(&self) -> usize {
        self.chunks.len()
    }

    pub fn codebooks(&self) -> &[Vec<Vec<f64>>] {
        &self.codebooks
    }

    /// Centroid index per chunk.
    pub fn encode(&self, vector: &[f64]) -> Result<Vec<usize>> {
        if vector.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.chunks
            .iter()
            .zip(&self.codebooks)
            .map(|(range, codebook)| {
                nearest_centroid(codebook, &vector[range.clone()], self.metric).map(|(i, _)| i)
            })
            .collect()
    }

    /// The vector composed of the code's centroids.
    pub fn decode(&self, code: &[usize]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.dimension);
        for (codebook, &c) in self.codebooks.iter().zip(code) {
            out.extend_from_slice(&codebook[c]);
        }
        out
    }

    pub fn quantize(&self, vector: &[f64]) -> Result<Vec<f64>> {
        Ok(self.decode(&self.encode(vector)?))
    }
}

/// Split `0..dimension` into `parts` contiguous ranges (at most `dimension`).
pub fn chunk_ranges(dimension: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, dimension.max(1));
    (0..parts)
        .map(|i| (i * dimension / parts)..((i + 1) * dimension / parts))
        .collect()
}

#[derive(Debug, Clone)]
struct PqNode {
    vector: Vec<f64>,
    /// Internal IDs of the original vectors that quantize to `vector`.
    bucket: Vec<usize>,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A k-d tree over distinct quantized vectors, stored as an arena.
#[derive(Debug, Clone, Default)]
pub struct QuantizedTree {
    nodes: Vec<PqNode>,
    root: Option<usize>,
    dimension: usize,
}

impl QuantizedTree {
    /// Build a balanced tree from `(quantized vector, bucket)` entries.
    pub fn build(entries: Vec<(Vec<f64>, Vec<usize>)>) -> Self {
        let dimension = entries.first().map_or(1, |(v, _)| v.len().max(1));
        let mut tree = Self {
            nodes: Vec::with_capacity(entries.len()),
            root: None,
            dimension,
        };
        tree.root = tree.build_subtree(entries, 0);
        tree
    }

    fn build_subtree(&mut self, mut entries: Vec<(Vec<f64>, Vec<usize>)>, depth: usize) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }
        let axis = depth % self.dimension;
        entries.sort_by(|a, b| a.0[axis].total_cmp(&b.0[axis]));

        let median = entries.len() / 2;
        let right = entries.split_off(median + 1);
        let (vector, bucket) = entries.pop()?;

        let index = self.nodes.len();
        self.nodes.push(PqNode {
            vector,
            bucket,
            axis,
            left: None,
            right: None,
        });
        let left = self.build_subtree(entries, depth + 1);
        let right = self.build_subtree(right, depth + 1);
        self.nodes[index].left = left;
        self.nodes[index].right = right;
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Best-first search for the node whose quantized vector is closest to
    /// `query`. Returns the node's bucket and its distance.
    ///
    /// Nodes are expanded in order of their own distance to the query. A far
    /// child is queued only when the splitting plane is within the best
    /// distance found so far (always, for metrics without per-axis bounds).
    pub fn nearest(&self, query: &[f64], metric: DistanceMetric) -> Result<Option<(&[usize], f64)>> {
        let Some(root) = self.root else {
            return Ok(None);
        };
        let prune = metric.supports_axis_pruning();

        let mut queue = MinHeap::new();
        queue.push(Neighbor::new(root, metric.distance(query, &self.nodes[root].vector)?));

        let mut best: Option<Neighbor> = None;
        while let Some(current) = queue.pop() {
            if best.map_or(true, |b| current.distance < b.distance) {
                best = Some(current);
            }

            let node = &self.nodes[current.id];
            let diff = query[node.axis] - node.vector[node.axis];
            let (near, far) = if diff < 0.0 {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };
            let bound = best.map_or(f64::INFINITY, |b| b.distance);

            let far = far.filter(|_| !prune || diff.abs() <= bound);
            for child in [near, far].into_iter().flatten() {
                queue.push(Neighbor::new(
                    child,
                    metric.distance(query, &self.nodes[child].vector)?,
                ));
            }
        }

        Ok(best.map(|b| (self.nodes[b.id].bucket.as_slice(), b.distance)))
    }
}
