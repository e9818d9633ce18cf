//! k-d tree: balanced median-split build, leaf insert, successor delete and
//! filtered k-nearest-neighbor search.
//!
//! Every node splits on axis `depth % dimension`. Items in a node's left
//! subtree have a coordinate `<=` the node's on that axis, items in the right
//! subtree `>=`.

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::item::{matches_filter, Filter, IndexKey};
use crate::neighbor_queue::{Neighbor, ResultSet};

#[derive(Debug)]
struct KdNode {
    key: IndexKey,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

impl KdNode {
    fn leaf(key: IndexKey) -> Self {
        Self {
            key,
            left: None,
            right: None,
        }
    }

    fn coord(&self, axis: usize) -> f64 {
        coord(&self.key, axis)
    }
}

fn coord(key: &IndexKey, axis: usize) -> f64 {
    key.vector.as_slice().get(axis).copied().unwrap_or(0.0)
}

/// Read-only parameters of one nearest-neighbor search.
struct SearchContext<'a> {
    query: &'a [f64],
    metric: DistanceMetric,
    max_distance: Option<f64>,
    filter: Option<&'a Filter>,
    prune: bool,
}

/// A k-d tree over item projections.
#[derive(Debug)]
pub struct KdTree {
    root: Option<Box<KdNode>>,
    dimension: usize,
    len: usize,
}

impl KdTree {
    /// Create an empty tree for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            root: None,
            dimension: dimension.max(1),
            len: 0,
        }
    }

    /// Build a balanced tree by recursive median split.
    ///
    /// Each level sorts its slice on the split axis, so the build costs
    /// O(n log² n).
    pub fn build(keys: Vec<IndexKey>, dimension: usize) -> Self {
        let mut tree = Self::new(dimension);
        tree.len = keys.len();
        tree.root = Self::build_subtree(keys, 0, tree.dimension);
        tree
    }

    fn build_subtree(mut keys: Vec<IndexKey>, depth: usize, dimension: usize) -> Option<Box<KdNode>> {
        if keys.is_empty() {
            return None;
        }

        let axis = depth % dimension;
        keys.sort_by(|a, b| coord(a, axis).total_cmp(&coord(b, axis)));

        let median = keys.len() / 2;
        let right = keys.split_off(median + 1);
        let key = keys.pop()?;

        Some(Box::new(KdNode {
            key,
            left: Self::build_subtree(keys, depth + 1, dimension),
            right: Self::build_subtree(right, depth + 1, dimension),
        }))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of levels on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        fn height(node: Option<&KdNode>) -> usize {
            node.map_or(0, |n| {
                1 + height(n.left.as_deref()).max(height(n.right.as_deref()))
            })
        }
        height(self.root.as_deref())
    }

    /// Insert a key as a new leaf. Does not rebalance.
    pub fn insert(&mut self, key: IndexKey) {
        let dimension = self.dimension;
        let mut slot = &mut self.root;
        let mut depth = 0;
        while let Some(node) = slot {
            let axis = depth % dimension;
            slot = if coord(&key, axis) < node.coord(axis) {
                &mut node.left
            } else {
                &mut node.right
            };
            depth += 1;
        }
        *slot = Some(Box::new(KdNode::leaf(key)));
        self.len += 1;
    }

    /// Delete the node holding `id`, located by descending on `vector`.
    /// Returns whether a node was removed.
    pub fn remove(&mut self, id: usize, vector: &[f64]) -> bool {
        let removed = Self::remove_at(&mut self.root, id, vector, 0, self.dimension);
        if removed {
            self.len -= 1;
        }
        removed
    }

    fn remove_at(
        slot: &mut Option<Box<KdNode>>,
        id: usize,
        vector: &[f64],
        depth: usize,
        dimension: usize,
    ) -> bool {
        let Some(node) = slot.as_mut() else {
            return false;
        };

        if node.key.id == id {
            Self::remove_node(slot, depth, dimension);
            return true;
        }

        let axis = depth % dimension;
        let target = vector.get(axis).copied().unwrap_or(0.0);
        let here = node.coord(axis);
        if target < here {
            Self::remove_at(&mut node.left, id, vector, depth + 1, dimension)
        } else if target > here {
            Self::remove_at(&mut node.right, id, vector, depth + 1, dimension)
        } else {
            // Equal coordinates may sit on either side of the split.
            Self::remove_at(&mut node.left, id, vector, depth + 1, dimension)
                || Self::remove_at(&mut node.right, id, vector, depth + 1, dimension)
        }
    }

    /// Remove the node in `slot`, keeping the split invariant.
    ///
    /// With a right subtree, the node takes the minimum of that subtree along
    /// its axis. With only a left subtree, it takes the left minimum and the
    /// remainder becomes its right subtree; splicing the child up directly
    /// would shift every descendant's split axis.
    fn remove_node(slot: &mut Option<Box<KdNode>>, depth: usize, dimension: usize) {
        let Some(node) = slot.as_mut() else {
            return;
        };
        let axis = depth % dimension;

        let from_right = node.right.is_some();
        let subtree = if from_right {
            &mut node.right
        } else {
            &mut node.left
        };
        let Some(successor) = Self::find_min(subtree.as_deref(), axis, depth + 1, dimension).cloned()
        else {
            *slot = None;
            return;
        };

        Self::remove_at(
            subtree,
            successor.id,
            successor.vector.as_slice(),
            depth + 1,
            dimension,
        );
        node.key = successor;
        if !from_right {
            node.right = node.left.take();
        }
    }

    /// The key with the smallest coordinate on `axis` in the subtree.
    fn find_min(
        node: Option<&KdNode>,
        axis: usize,
        depth: usize,
        dimension: usize,
    ) -> Option<&IndexKey> {
        let node = node?;
        let left = Self::find_min(node.left.as_deref(), axis, depth + 1, dimension);
        // Splitting on the same axis bounds the right side from below.
        let right = if depth % dimension != axis {
            Self::find_min(node.right.as_deref(), axis, depth + 1, dimension)
        } else {
            None
        };

        let mut best = &node.key;
        for candidate in [left, right].into_iter().flatten() {
            if coord(candidate, axis) < coord(best, axis) {
                best = candidate;
            }
        }
        Some(best)
    }

    /// Exact k-nearest neighbors of `query` that pass `filter` and lie within
    /// `max_distance`, ascending by distance.
    ///
    /// Far branches are pruned only when the metric supports per-axis
    /// bounds (Euclidean); for other metrics every node is visited.
    pub fn nearest(
        &self,
        query: &[f64],
        k: usize,
        metric: DistanceMetric,
        max_distance: Option<f64>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let ctx = SearchContext {
            query,
            metric,
            max_distance,
            filter,
            prune: metric.supports_axis_pruning(),
        };
        let mut results = ResultSet::new(k);
        self.search_node(self.root.as_deref(), 0, &ctx, &mut results)?;
        Ok(results.into_vec())
    }

    fn search_node(
        &self,
        node: Option<&KdNode>,
        depth: usize,
        ctx: &SearchContext<'_>,
        results: &mut ResultSet,
    ) -> Result<()> {
        let Some(node) = node else {
            return Ok(());
        };

        let axis = depth % self.dimension;
        let diff = ctx.query.get(axis).copied().unwrap_or(0.0) - node.coord(axis);
        let (near, far) = if diff < 0.0 {
            (node.left.as_deref(), node.right.as_deref())
        } else {
            (node.right.as_deref(), node.left.as_deref())
        };

        self.search_node(near, depth + 1, ctx, results)?;

        if matches_filter(ctx.filter, &node.key.metadata) {
            let distance = ctx.metric.distance(ctx.query, node.key.vector.as_slice())?;
            if ctx.max_distance.map_or(true, |max| distance <= max) {
                results.insert(Neighbor::new(node.key.id, distance));
            }
        }

        let gap = diff.abs();
        let visit_far = !ctx.prune
            || (ctx.max_distance.map_or(true, |max| gap <= max)
                && (!results.is_full() || gap <= results.worst_distance()));
        if visit_far {
            self.search_node(far, depth + 1, ctx, results)?;
        }
        Ok(())
    }

    /// Keys in depth-first pre-order.
    pub fn keys(&self) -> Vec<&IndexKey> {
        fn walk<'a>(node: Option<&'a KdNode>, out: &mut Vec<&'a IndexKey>) {
            if let Some(node) = node {
                out.push(&node.key);
                walk(node.left.as_deref(), out);
                walk(node.right.as_deref(), out);
            }
        }
        let mut out = Vec::with_capacity(self.len);
        walk(self.root.as_deref(), &mut out);
        out
    }
}
