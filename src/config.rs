//! Collection configuration: metric, configured indexes and their parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use crate::index::IndexType;

/// Configuration for a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Distance metric shared by every index of the collection.
    pub metric: DistanceMetric,
    /// Index variants kept in sync with the item store. The first one is the
    /// default query target.
    pub indexes: Vec<IndexType>,
    pub pq: PqParams,
    pub lsh: LshParams,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Euclidean,
            indexes: vec![IndexType::BruteForce],
            pq: PqParams::default(),
            lsh: LshParams::default(),
        }
    }
}

impl CollectionConfig {
    pub fn new(metric: DistanceMetric, indexes: impl IntoIterator<Item = IndexType>) -> Self {
        Self {
            metric,
            indexes: indexes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A configuration carrying every index variant.
    pub fn all_indexes(metric: DistanceMetric) -> Self {
        Self::new(metric, IndexType::ALL)
    }

    pub fn with_pq(mut self, pq: PqParams) -> Self {
        self.pq = pq;
        self
    }

    pub fn with_lsh(mut self, lsh: LshParams) -> Self {
        self.lsh = lsh;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: CollectionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter values no index can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.indexes.is_empty() {
            return Err(VectorDbError::InvalidParameter(
                "at least one index type must be configured".to_string(),
            ));
        }
        self.pq.validate()?;
        self.lsh.validate()
    }
}

/// Product quantization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PqParams {
    /// Number of contiguous chunks each vector is split into.
    pub num_subvectors: usize,
    /// Number of k-means centroids per chunk.
    pub num_centroids: usize,
    /// Upper bound on k-means reassignment rounds.
    pub max_iterations: usize,
    /// Seed for centroid initialization; random when unset.
    pub seed: Option<u64>,
}

impl Default for PqParams {
    fn default() -> Self {
        Self {
            num_subvectors: 2,
            num_centroids: 16,
            max_iterations: 100,
            seed: None,
        }
    }
}

impl PqParams {
    pub fn new(num_subvectors: usize, num_centroids: usize) -> Self {
        Self {
            num_subvectors,
            num_centroids,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_subvectors == 0 || self.num_centroids == 0 {
            return Err(VectorDbError::InvalidParameter(
                "num_subvectors and num_centroids must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hash family used by the LSH index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LshScheme {
    /// Exact-match hashing of contiguous coordinate bands.
    Banded {
        num_bands: usize,
        rows_per_band: usize,
    },
    /// Weighted-sum universal hashing with coefficients in [0, 1), rounded to
    /// `precision` decimal places.
    Projection {
        num_hash_functions: usize,
        precision: usize,
    },
    /// Sign bits of Gaussian random hyperplanes, one integer key per table.
    Hyperplane { num_tables: usize, num_bits: usize },
}

impl Default for LshScheme {
    fn default() -> Self {
        LshScheme::Projection {
            num_hash_functions: 5,
            precision: 2,
        }
    }
}

/// Locality-sensitive hashing parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LshParams {
    pub scheme: LshScheme,
    /// Seed for the random hash functions; random when unset.
    pub seed: Option<u64>,
}

impl LshParams {
    pub fn banded(num_bands: usize, rows_per_band: usize) -> Self {
        Self {
            scheme: LshScheme::Banded {
                num_bands,
                rows_per_band,
            },
            seed: None,
        }
    }

    pub fn projection(num_hash_functions: usize, precision: usize) -> Self {
        Self {
            scheme: LshScheme::Projection {
                num_hash_functions,
                precision,
            },
            seed: None,
        }
    }

    pub fn hyperplane(num_tables: usize, num_bits: usize) -> Self {
        Self {
            scheme: LshScheme::Hyperplane {
                num_tables,
                num_bits,
            },
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ok = match self.scheme {
            LshScheme::Banded {
                num_bands,
                rows_per_band,
            } => num_bands > 0 && rows_per_band > 0,
            LshScheme::Projection {
                num_hash_functions, ..
            } => num_hash_functions > 0,
            // Keys are u64 bit masks.
            LshScheme::Hyperplane {
                num_tables,
                num_bits,
            } => num_tables > 0 && num_bits > 0 && num_bits <= 64,
        };
        if ok {
            Ok(())
        } else {
            Err(VectorDbError::InvalidParameter(format!(
                "invalid LSH parameters: {:?}",
                self.scheme
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectionConfig::default();
        assert_eq!(config.metric, DistanceMetric::Euclidean);
        assert_eq!(config.indexes, vec![IndexType::BruteForce]);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_json() {
        let config: CollectionConfig = serde_json::from_str(
            r#"{
                "metric": "cosine",
                "indexes": ["kd-tree", "lsh"],
                "lsh": { "scheme": { "kind": "banded", "num_bands": 2, "rows_per_band": 3 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.metric, DistanceMetric::Cosine);
        assert_eq!(config.indexes, vec![IndexType::KdTree, IndexType::Lsh]);
        assert_eq!(config.lsh.scheme, LshScheme::Banded { num_bands: 2, rows_per_band: 3 });
        assert_eq!(config.pq, PqParams::default());
    }

    #[test]
    fn test_validate_rejects_zero_parameters() {
        assert!(PqParams::new(0, 4).validate().is_err());
        assert!(PqParams::new(2, 0).validate().is_err());
        assert!(LshParams::banded(0, 2).validate().is_err());
        assert!(LshParams::projection(0, 2).validate().is_err());
        assert!(LshParams::hyperplane(4, 65).validate().is_err());
        assert!(CollectionConfig::new(DistanceMetric::Euclidean, []).validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "metric": "jaccard", "pq": { "num_centroids": 4 } }"#).unwrap();

        let config = CollectionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.metric, DistanceMetric::Jaccard);
        assert_eq!(config.pq.num_centroids, 4);
        assert_eq!(config.pq.num_subvectors, 2);
    }
}
