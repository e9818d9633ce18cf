//! Index trait for pluggable search backends

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::brute_force::BruteForceIndex;
use crate::config::CollectionConfig;
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::item::{Filter, IndexKey};
use crate::kdtree::KdTreeIndex;
use crate::lsh::LshIndex;
use crate::pq::KdTreePqIndex;

/// A search index that supports insertion, removal, rebuild and filtered k-NN search.
///
/// Implementations address items by the `usize` internal ID the `Collection`
/// assigns; the collection handles the String-to-usize mapping.
pub trait Index {
    /// Record an item projection for future indexing. Overwrites by ID.
    ///
    /// Some variants only make the item queryable after the next `build`.
    fn add(&mut self, key: IndexKey) -> Result<()>;

    /// Remove the item with the given internal ID. A no-op if it is absent.
    fn remove(&mut self, id: usize);

    /// (Re)construct the query-time structure from the current working set.
    ///
    /// Each call fully supersedes the previous structure. An empty working
    /// set produces an empty, queryable structure.
    fn build(&mut self) -> Result<()>;

    /// Search for at most `k` neighbors of `query` that satisfy `filter` and
    /// lie within `max_distance`.
    /// Returns a Vec of `(id, distance)` pairs sorted by distance ascending.
    fn search(
        &self,
        query: &[f64],
        k: usize,
        max_distance: Option<f64>,
        filter: Option<&Filter>,
    ) -> Result<Vec<(usize, f64)>>;

    /// The distance metric used by this index.
    fn metric(&self) -> DistanceMetric;

    /// The number of items in the working set.
    fn len(&self) -> usize;

    /// Whether the working set is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reject a query whose dimension differs from the indexed data.
pub(crate) fn check_dimension(expected: Option<usize>, query: &[f64]) -> Result<()> {
    match expected {
        Some(expected) if expected != query.len() => Err(VectorDbError::DimensionMismatch {
            expected,
            actual: query.len(),
        }),
        _ => Ok(()),
    }
}

/// Selector naming one of the index variants a collection can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexType {
    BruteForce,
    KdTree,
    KdTreePq,
    Lsh,
}

impl IndexType {
    pub const ALL: [IndexType; 4] = [
        IndexType::BruteForce,
        IndexType::KdTree,
        IndexType::KdTreePq,
        IndexType::Lsh,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndexType::BruteForce => "brute-force",
            IndexType::KdTree => "kd-tree",
            IndexType::KdTreePq => "kd-tree-pq",
            IndexType::Lsh => "lsh",
        }
    }

    /// Whether the variant returns exactly the same results as a linear scan.
    pub fn is_exact(&self) -> bool {
        matches!(self, IndexType::BruteForce | IndexType::KdTree)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexType {
    type Err = VectorDbError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        IndexType::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| {
                VectorDbError::InvalidParameter(format!("unknown index type: {}", s))
            })
    }
}

/// The closed set of index implementations a collection dispatches over.
#[derive(Debug)]
pub enum AnyIndex {
    BruteForce(BruteForceIndex),
    KdTree(KdTreeIndex),
    KdTreePq(KdTreePqIndex),
    Lsh(LshIndex),
}

macro_rules! dispatch {
    ($self:expr, $index:ident => $body:expr) => {
        match $self {
            AnyIndex::BruteForce($index) => $body,
            AnyIndex::KdTree($index) => $body,
            AnyIndex::KdTreePq($index) => $body,
            AnyIndex::Lsh($index) => $body,
        }
    };
}

impl AnyIndex {
    /// Create an empty index of the given type for a collection.
    pub fn new(index_type: IndexType, config: &CollectionConfig) -> Self {
        let metric = config.metric;
        match index_type {
            IndexType::BruteForce => AnyIndex::BruteForce(BruteForceIndex::new(metric)),
            IndexType::KdTree => AnyIndex::KdTree(KdTreeIndex::new(metric)),
            IndexType::KdTreePq => {
                AnyIndex::KdTreePq(KdTreePqIndex::with_params(metric, config.pq.clone()))
            }
            IndexType::Lsh => AnyIndex::Lsh(LshIndex::with_params(metric, config.lsh.clone())),
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            AnyIndex::BruteForce(_) => IndexType::BruteForce,
            AnyIndex::KdTree(_) => IndexType::KdTree,
            AnyIndex::KdTreePq(_) => IndexType::KdTreePq,
            AnyIndex::Lsh(_) => IndexType::Lsh,
        }
    }
}

impl Index for AnyIndex {
    fn add(&mut self, key: IndexKey) -> Result<()> {
        dispatch!(self, index => index.add(key))
    }

    fn remove(&mut self, id: usize) {
        dispatch!(self, index => index.remove(id))
    }

    fn build(&mut self) -> Result<()> {
        dispatch!(self, index => index.build())
    }

    fn search(
        &self,
        query: &[f64],
        k: usize,
        max_distance: Option<f64>,
        filter: Option<&Filter>,
    ) -> Result<Vec<(usize, f64)>> {
        dispatch!(self, index => index.search(query, k, max_distance, filter))
    }

    fn metric(&self) -> DistanceMetric {
        dispatch!(self, index => index.metric())
    }

    fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }
}
