//! Neighbor ordering utilities: a min-heap for best-first traversal and a
//! bounded, sorted result list for k-best maintenance.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A neighbor entry with a distance and internal ID.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub distance: f64,
    pub id: usize,
}

impl Neighbor {
    pub fn new(id: usize, distance: f64) -> Self {
        Self { distance, id }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

// Default ordering: max-heap (largest distance on top).
// `Reversed` below flips it for the min-heap.
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A wrapper that reverses Neighbor ordering to create a min-heap.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Reversed(pub Neighbor);

impl PartialOrd for Reversed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reversed {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// Min-heap of neighbors (smallest distance on top). Used as the candidate queue.
#[derive(Debug, Default)]
pub struct MinHeap {
    heap: BinaryHeap<Reversed>,
}

impl MinHeap {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, n: Neighbor) {
        self.heap.push(Reversed(n));
    }

    pub fn peek(&self) -> Option<&Neighbor> {
        self.heap.peek().map(|r| &r.0)
    }

    pub fn pop(&mut self) -> Option<Neighbor> {
        self.heap.pop().map(|r| r.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// The best `capacity` neighbors seen so far, kept sorted ascending by distance.
///
/// Entries are ordered by distance, then by ID. Since IDs ascend in
/// insertion order, equal distances keep insertion order regardless of the
/// order a traversal admits them in.
#[derive(Debug)]
pub struct ResultSet {
    capacity: usize,
    entries: Vec<Neighbor>,
}

impl ResultSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Distance of the worst admitted entry, or +infinity while not full.
    pub fn worst_distance(&self) -> f64 {
        if !self.is_full() {
            return f64::INFINITY;
        }
        self.entries
            .last()
            .map_or(f64::NEG_INFINITY, |n| n.distance)
    }

    /// Whether `n` would be kept: the set is not full, or `n` orders
    /// strictly before the worst entry.
    pub fn admits(&self, n: &Neighbor) -> bool {
        if !self.is_full() {
            return true;
        }
        self.entries.last().map_or(false, |worst| n < worst)
    }

    /// Insert a neighbor, evicting the worst entry when over capacity.
    /// Returns whether the neighbor was kept.
    pub fn insert(&mut self, n: Neighbor) -> bool {
        if !self.admits(&n) {
            return false;
        }
        let pos = self.entries.partition_point(|e| e < &n);
        self.entries.insert(pos, n);
        if self.entries.len() > self.capacity {
            self.entries.pop();
        }
        true
    }

    pub fn as_slice(&self) -> &[Neighbor] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Neighbor> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_heap_ordering() {
        let mut heap = MinHeap::new();
        heap.push(Neighbor::new(0, 3.0));
        heap.push(Neighbor::new(1, 1.0));
        heap.push(Neighbor::new(2, 2.0));

        assert_eq!(heap.peek().unwrap().id, 1);
        assert_eq!(heap.pop().unwrap().distance, 1.0);
        assert_eq!(heap.pop().unwrap().distance, 2.0);
        assert_eq!(heap.pop().unwrap().distance, 3.0);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_result_set_bounded() {
        let mut results = ResultSet::new(2);
        assert_eq!(results.worst_distance(), f64::INFINITY);
        assert!(results.insert(Neighbor::new(0, 5.0)));
        assert!(results.insert(Neighbor::new(1, 1.0)));
        assert_eq!(results.worst_distance(), 5.0);
        assert!(results.insert(Neighbor::new(2, 3.0)));

        assert_eq!(results.len(), 2);
        let sorted = results.into_vec();
        assert_eq!(sorted[0].distance, 1.0);
        assert_eq!(sorted[1].distance, 3.0);
    }

    #[test]
    fn test_result_set_ties_prefer_lower_id() {
        let mut results = ResultSet::new(1);
        assert!(results.insert(Neighbor::new(4, 2.0)));
        assert!(!results.insert(Neighbor::new(9, 2.0)));
        assert!(results.insert(Neighbor::new(1, 2.0)));
        assert_eq!(results.as_slice()[0].id, 1);
    }

    #[test]
    fn test_result_set_equal_distances_sorted_by_id() {
        let mut results = ResultSet::new(3);
        results.insert(Neighbor::new(7, 1.0));
        results.insert(Neighbor::new(3, 1.0));
        results.insert(Neighbor::new(5, 0.5));
        let ids: Vec<usize> = results.into_vec().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![5, 3, 7]);
    }

    #[test]
    fn test_result_set_zero_capacity() {
        let mut results = ResultSet::new(0);
        assert!(results.is_full());
        assert!(!results.insert(Neighbor::new(0, 0.0)));
        assert!(results.is_empty());
    }
}
