//! Banded exact-match hashing.

use std::ops::Range;

use super::LshHasher;

/// Hashes each contiguous band of coordinates to the literal coordinate
/// tuple, so two vectors collide in a band only when the band is identical.
#[derive(Debug, Clone)]
pub struct BandedHasher {
    bands: Vec<Range<usize>>,
}

impl BandedHasher {
    /// Bands that would start past the end of the vector are dropped; the
    /// last kept band may be shorter than `rows_per_band`.
    pub fn new(dimension: usize, num_bands: usize, rows_per_band: usize) -> Self {
        let rows = rows_per_band.max(1);
        let bands = (0..num_bands)
            .map(|band| band * rows)
            .take_while(|&start| start < dimension)
            .map(|start| start..(start + rows).min(dimension))
            .collect();
        Self { bands }
    }

    pub fn bands(&self) -> &[Range<usize>] {
        &self.bands
    }
}

impl LshHasher for BandedHasher {
    type Key = String;

    fn num_tables(&self) -> usize {
        self.bands.len()
    }

    fn hash(&self, vector: &[f64]) -> Vec<String> {
        self.bands
            .iter()
            .map(|band| {
                vector[band.clone()]
                    .iter()
                    // -0.0 and 0.0 share a bucket.
                    .map(|x| (x + 0.0).to_string())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect()
    }
}
