//! Brute-force index: O(n) filtered k-NN search

use std::collections::BTreeMap;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::Index;
use crate::item::{matches_filter, Filter, IndexKey};

/// A flat (brute-force) index that computes distance to every stored vector.
///
/// This is the correctness baseline the other indexes are measured against.
#[derive(Debug)]
pub struct BruteForceIndex {
    keys: BTreeMap<usize, IndexKey>,
    metric: DistanceMetric,
}

impl BruteForceIndex {
    /// Create a new empty brute-force index with the given distance metric.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            keys: BTreeMap::new(),
            metric,
        }
    }

    /// Get an item projection by internal ID.
    pub fn get(&self, id: usize) -> Option<&IndexKey> {
        self.keys.get(&id)
    }

    /// Iterate over all projections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexKey> {
        self.keys.values()
    }
}

impl Index for BruteForceIndex {
    fn add(&mut self, key: IndexKey) -> Result<()> {
        self.keys.insert(key.id, key);
        Ok(())
    }

    fn remove(&mut self, id: usize) {
        self.keys.remove(&id);
    }

    fn build(&mut self) -> Result<()> {
        Ok(())
    }

    fn search(
        &self,
        query: &[f64],
        k: usize,
        max_distance: Option<f64>,
        filter: Option<&Filter>,
    ) -> Result<Vec<(usize, f64)>> {
        let mut results = Vec::new();
        for key in self.keys.values() {
            if !matches_filter(filter, &key.metadata) {
                continue;
            }
            let distance = self.metric.distance(query, key.vector.as_slice())?;
            if max_distance.map_or(true, |max| distance <= max) {
                results.push((key.id, distance));
            }
        }

        // Stable sort keeps insertion order among equal distances.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorDbError;
    use crate::item::Metadata;
    use crate::vector::Vector;

    fn key(id: usize, v: Vec<f64>, category: &str) -> IndexKey {
        let mut metadata = Metadata::new();
        metadata.insert("category".to_string(), category.to_string());
        IndexKey::new(id, Vector::new(v), metadata)
    }

    fn sample_index() -> BruteForceIndex {
        let mut index = BruteForceIndex::new(DistanceMetric::Euclidean);
        index.add(key(0, vec![1.0, 0.0, 0.0], "A")).unwrap();
        index.add(key(1, vec![0.0, 1.0, 0.0], "B")).unwrap();
        index.add(key(2, vec![1.0, 1.0, 0.0], "A")).unwrap();
        index
    }

    #[test]
    fn test_brute_force_basic() {
        let index = sample_index();
        let results = index.search(&[1.0, 0.0, 0.0], 2, None, None).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0); // exact match
        assert!(results[0].1 < 1e-12);
        assert_eq!(results[1].0, 2);
    }

    #[test]
    fn test_brute_force_filter_and_max_distance() {
        let index = sample_index();
        let filter = Filter::new().with("category", "B");
        let results = index.search(&[1.0, 0.0, 0.0], 5, None, Some(&filter)).unwrap();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1]);

        let results = index.search(&[1.0, 0.0, 0.0], 5, Some(1.0), None).unwrap();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_brute_force_ties_keep_insertion_order() {
        let mut index = BruteForceIndex::new(DistanceMetric::Euclidean);
        index.add(key(3, vec![1.0, 0.0], "A")).unwrap();
        index.add(key(4, vec![-1.0, 0.0], "A")).unwrap();
        index.add(key(5, vec![0.0, 1.0], "A")).unwrap();

        let results = index.search(&[0.0, 0.0], 3, None, None).unwrap();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_brute_force_remove_and_overwrite() {
        let mut index = sample_index();
        index.remove(0);
        index.remove(42);
        assert_eq!(index.len(), 2);

        index.add(key(1, vec![5.0, 5.0, 5.0], "C")).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1).unwrap().vector.as_slice(), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_brute_force_dimension_mismatch() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1, None, None),
            Err(VectorDbError::DimensionMismatch { .. })
        ));
    }
}
