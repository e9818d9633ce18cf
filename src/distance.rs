//! Distance metrics for vector similarity

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VectorDbError};
use crate::vector::{dot, norm};
use serde::{Deserialize, Serialize};

/// Distance metrics for measuring vector similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean (L2) distance
    #[default]
    Euclidean,
    /// Cosine similarity (converted to distance: 1 - similarity)
    Cosine,
    /// Jaccard distance over the sets of coordinate values
    Jaccard,
}

impl DistanceMetric {
    /// Compute the distance between two vectors using this metric
    pub fn distance(&self, v1: &[f64], v2: &[f64]) -> Result<f64> {
        if v1.len() != v2.len() {
            return Err(VectorDbError::DimensionMismatch {
                expected: v1.len(),
                actual: v2.len(),
            });
        }

        Ok(match self {
            DistanceMetric::Euclidean => euclidean_distance(v1, v2),
            DistanceMetric::Cosine => cosine_distance(v1, v2),
            DistanceMetric::Jaccard => jaccard_distance(v1, v2),
        })
    }

    /// Whether a per-axis coordinate gap is a lower bound on the full distance.
    ///
    /// Only then may a k-d tree skip the far side of a splitting plane.
    pub fn supports_axis_pruning(&self) -> bool {
        matches!(self, DistanceMetric::Euclidean)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Jaccard => "jaccard",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = VectorDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            "jaccard" => Ok(DistanceMetric::Jaccard),
            _ => Err(VectorDbError::UnsupportedMetric {
                name: s.to_string(),
            }),
        }
    }
}

/// Compute Euclidean (L2) distance between two vectors
pub fn euclidean_distance(v1: &[f64], v2: &[f64]) -> f64 {
    v1.iter()
        .zip(v2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Compute cosine distance between two vectors (1 - cosine similarity).
///
/// A zero vector has no direction; it is treated as orthogonal to everything
/// (distance 1.0) so the metric stays total and non-negative.
pub fn cosine_distance(v1: &[f64], v2: &[f64]) -> f64 {
    let norm1 = norm(v1);
    let norm2 = norm(v2);

    if norm1 == 0.0 || norm2 == 0.0 {
        return 1.0;
    }

    let similarity = dot(v1, v2) / (norm1 * norm2);

    // Clamp to [-1, 1] to handle floating point errors
    let similarity = similarity.clamp(-1.0, 1.0);

    1.0 - similarity
}

/// Compute Jaccard distance, treating each vector as the set of its values.
///
/// Two empty vectors are identical (distance 0.0).
pub fn jaccard_distance(v1: &[f64], v2: &[f64]) -> f64 {
    let set1: HashSet<u64> = v1.iter().map(|&x| value_key(x)).collect();
    let set2: HashSet<u64> = v2.iter().map(|&x| value_key(x)).collect();

    let union = set1.union(&set2).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set1.intersection(&set2).count();

    1.0 - intersection as f64 / union as f64
}

// -0.0 and 0.0 are the same set member.
fn value_key(x: f64) -> u64 {
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}
