//! Weighted-sum universal hashing.

use rand::rngs::StdRng;
use rand::Rng;

use super::LshHasher;

/// Each hash function is a coefficient vector drawn uniformly from [0, 1).
/// The key is the weighted sum rounded to `precision` decimal places.
#[derive(Debug, Clone)]
pub struct ProjectionHasher {
    coefficients: Vec<Vec<f64>>,
    precision: usize,
}

impl ProjectionHasher {
    pub fn new(dimension: usize, num_hash_functions: usize, precision: usize, rng: &mut StdRng) -> Self {
        let coefficients = (0..num_hash_functions)
            .map(|_| (0..dimension).map(|_| rng.gen::<f64>()).collect())
            .collect();
        Self {
            coefficients,
            precision,
        }
    }

    pub fn coefficients(&self) -> &[Vec<f64>] {
        &self.coefficients
    }
}

impl LshHasher for ProjectionHasher {
    type Key = String;

    fn num_tables(&self) -> usize {
        self.coefficients.len()
    }

    fn hash(&self, vector: &[f64]) -> Vec<String> {
        self.coefficients
            .iter()
            .map(|coefficients| {
                let sum = crate::vector::dot(coefficients, vector);
                format!("{:.*}", self.precision, sum)
            })
            .collect()
    }
}
