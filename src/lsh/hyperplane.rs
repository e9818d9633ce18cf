//! Random-hyperplane (sign bit) hashing.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::Rng;

use super::LshHasher;

/// `num_tables` independent tables, each keyed by the sign pattern of the
/// vector against `num_bits` Gaussian hyperplanes through the origin.
#[derive(Debug, Clone)]
pub struct HyperplaneHasher {
    /// `planes[table][bit]` is one hyperplane normal.
    planes: Vec<Vec<Vec<f64>>>,
}

impl HyperplaneHasher {
    pub fn new(dimension: usize, num_tables: usize, num_bits: usize, rng: &mut StdRng) -> Self {
        let bits = num_bits.min(64);
        let planes = (0..num_tables)
            .map(|_| {
                (0..bits)
                    .map(|_| (0..dimension).map(|_| gaussian(rng)).collect())
                    .collect()
            })
            .collect();
        Self { planes }
    }

    pub fn num_bits(&self) -> usize {
        self.planes.first().map_or(0, |t| t.len())
    }
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian(rng: &mut StdRng) -> f64 {
    // u1 in (0, 1] keeps ln finite.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

impl LshHasher for HyperplaneHasher {
    type Key = u64;

    fn num_tables(&self) -> usize {
        self.planes.len()
    }

    fn hash(&self, vector: &[f64]) -> Vec<u64> {
        self.planes
            .iter()
            .map(|table| {
                table.iter().enumerate().fold(0u64, |key, (bit, plane)| {
                    if crate::vector::dot(plane, vector) >= 0.0 {
                        key | (1 << bit)
                    } else {
                        key
                    }
                })
            })
            .collect()
    }
}
