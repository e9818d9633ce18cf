//! LSH (locality-sensitive hashing) index.
//!
//! Three interchangeable hash families:
//! - banded exact-match hashing of coordinate groups
//! - weighted-sum universal hashing with rounded keys
//! - random-hyperplane sign bits
//!
//! Every family produces one key per hash table. A query unions the buckets
//! its own keys select across all tables and re-ranks that candidate set by
//! exact distance. Recall depends on the number of tables and how coarse the
//! keys are; the true nearest neighbor is not guaranteed to be a candidate.

pub mod banded;
pub mod hyperplane;
pub mod projection;

pub use banded::BandedHasher;
pub use hyperplane::HyperplaneHasher;
pub use projection::ProjectionHasher;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::{LshParams, LshScheme};
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::{check_dimension, Index};
use crate::item::{matches_filter, Filter, IndexKey};

/// A hash family producing one bucket key per table.
pub trait LshHasher {
    type Key: Hash + Eq + Clone + Debug;

    fn num_tables(&self) -> usize;

    /// Keys of `vector`, one per table, in table order.
    fn hash(&self, vector: &[f64]) -> Vec<Self::Key>;
}

/// Bucket tables for one hash family.
#[derive(Debug, Clone)]
pub struct HashTables<H: LshHasher> {
    hasher: H,
    tables: Vec<HashMap<H::Key, BTreeSet<usize>>>,
}

impl<H: LshHasher> HashTables<H> {
    pub fn new(hasher: H) -> Self {
        let tables = (0..hasher.num_tables()).map(|_| HashMap::new()).collect();
        Self { hasher, tables }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn insert(&mut self, id: usize, vector: &[f64]) {
        for (table, key) in self.tables.iter_mut().zip(self.hasher.hash(vector)) {
            table.entry(key).or_default().insert(id);
        }
    }

    pub fn remove(&mut self, id: usize, vector: &[f64]) {
        for (table, key) in self.tables.iter_mut().zip(self.hasher.hash(vector)) {
            if let Some(bucket) = table.get_mut(&key) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    table.remove(&key);
                }
            }
        }
    }

    /// Union of the buckets `query` hashes to, in ascending id order.
    pub fn candidates(&self, query: &[f64]) -> BTreeSet<usize> {
        let mut candidates = BTreeSet::new();
        for (table, key) in self.tables.iter().zip(self.hasher.hash(query)) {
            if let Some(bucket) = table.get(&key) {
                candidates.extend(bucket.iter().copied());
            }
        }
        candidates
    }

    /// Total number of non-empty buckets across tables.
    pub fn num_buckets(&self) -> usize {
        self.tables.iter().map(HashMap::len).sum()
    }
}

#[derive(Debug, Clone)]
enum Tables {
    Banded(HashTables<BandedHasher>),
    Projection(HashTables<ProjectionHasher>),
    Hyperplane(HashTables<HyperplaneHasher>),
}

macro_rules! with_tables {
    ($tables:expr, $t:ident => $body:expr) => {
        match $tables {
            Tables::Banded($t) => $body,
            Tables::Projection($t) => $body,
            Tables::Hyperplane($t) => $body,
        }
    };
}

/// An approximate index over hash buckets.
///
/// Hash functions are drawn at `build`, once the dimension is known. After
/// that, `add` and `remove` keep the buckets current until the next build.
#[derive(Debug)]
pub struct LshIndex {
    keys: BTreeMap<usize, IndexKey>,
    params: LshParams,
    metric: DistanceMetric,
    dimension: Option<usize>,
    seed: u64,
    tables: Option<Tables>,
}

impl LshIndex {
    /// Create a new LSH index with the default (projection) hash family.
    pub fn new(metric: DistanceMetric) -> Self {
        Self::with_params(metric, LshParams::default())
    }

    pub fn with_params(metric: DistanceMetric, params: LshParams) -> Self {
        let seed = params
            .seed
            .unwrap_or_else(|| StdRng::from_entropy().gen());
        Self {
            keys: BTreeMap::new(),
            params,
            metric,
            dimension: None,
            seed,
            tables: None,
        }
    }

    pub fn params(&self) -> &LshParams {
        &self.params
    }

    pub fn num_tables(&self) -> usize {
        self.tables
            .as_ref()
            .map_or(0, |tables| with_tables!(tables, t => t.tables.len()))
    }

    pub fn num_buckets(&self) -> usize {
        self.tables
            .as_ref()
            .map_or(0, |tables| with_tables!(tables, t => t.num_buckets()))
    }

    fn new_tables(&self, dimension: usize) -> Tables {
        let mut rng = StdRng::seed_from_u64(self.seed);
        match self.params.scheme {
            LshScheme::Banded {
                num_bands,
                rows_per_band,
            } => {
                let hasher = BandedHasher::new(dimension, num_bands, rows_per_band);
                if hasher.num_tables() < num_bands {
                    warn!(
                        num_bands,
                        used = hasher.num_tables(),
                        dimension,
                        "more LSH bands than the vectors can fill"
                    );
                }
                Tables::Banded(HashTables::new(hasher))
            }
            LshScheme::Projection {
                num_hash_functions,
                precision,
            } => Tables::Projection(HashTables::new(ProjectionHasher::new(
                dimension,
                num_hash_functions,
                precision,
                &mut rng,
            ))),
            LshScheme::Hyperplane {
                num_tables,
                num_bits,
            } => Tables::Hyperplane(HashTables::new(HyperplaneHasher::new(
                dimension, num_tables, num_bits, &mut rng,
            ))),
        }
    }
}

impl Index for LshIndex {
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

        let old = self.keys.insert(key.id, key.clone());
        if let Some(tables) = &mut self.tables {
            with_tables!(tables, t => {
                if let Some(old) = old {
                    t.remove(old.id, old.vector.as_slice());
                }
                t.insert(key.id, key.vector.as_slice());
            });
        }
        Ok(())
    }

    fn remove(&mut self, id: usize) {
        let Some(old) = self.keys.remove(&id) else {
            return;
        };
        if let Some(tables) = &mut self.tables {
            with_tables!(tables, t => t.remove(id, old.vector.as_slice()));
        }
        if self.keys.is_empty() {
            self.dimension = None;
            self.tables = None;
        }
    }

    fn build(&mut self) -> Result<()> {
        self.params.validate()?;
        let Some(dimension) = self.dimension else {
            self.tables = None;
            return Ok(());
        };

        let mut tables = self.new_tables(dimension);
        with_tables!(&mut tables, t => {
            for key in self.keys.values() {
                t.insert(key.id, key.vector.as_slice());
            }
        });
        self.tables = Some(tables);

        debug!(
            items = self.keys.len(),
            tables = self.num_tables(),
            buckets = self.num_buckets(),
            "built LSH tables"
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
        let Some(tables) = &self.tables else {
            return Ok(Vec::new());
        };

        let candidates = with_tables!(tables, t => t.candidates(query));
        let mut results = Vec::with_capacity(candidates.len());
        for id in candidates {
            let Some(key) = self.keys.get(&id) else {
                continue;
            };
            if !matches_filter(filter, &key.metadata) {
                continue;
            }
            let distance = self.metric.distance(query, key.vector.as_slice())?;
            if max_distance.map_or(true, |max| distance <= max) {
                results.push((id, distance));
            }
        }

        // Candidates arrive in id order; the stable sort keeps it among ties.
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
