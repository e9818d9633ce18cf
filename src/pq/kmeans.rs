//! k-means clustering used to train product-quantization codebooks.

use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};

/// Lloyd's k-means with random initialization.
///
/// Initial centroids are `k` distinct data points drawn at random. Points are
/// reassigned until no assignment changes or `max_iterations` rounds ran.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    metric: DistanceMetric,
}

/// Outcome of a k-means fit.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index of every input point, in input order.
    pub assignments: Vec<usize>,
    /// Number of assignment rounds performed.
    pub iterations: usize,
}

impl KMeans {
    /// Create new k-means with k clusters.
    pub fn new(k: usize, max_iterations: usize, metric: DistanceMetric) -> Result<Self> {
        if k == 0 {
            return Err(VectorDbError::InvalidParameter(
                "k must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            k,
            max_iterations: max_iterations.max(1),
            metric,
        })
    }

    /// Cluster `points`. When there are fewer points than `k`, every point
    /// becomes its own centroid.
    pub fn fit(&self, points: &[&[f64]], rng: &mut StdRng) -> Result<Clustering> {
        if points.is_empty() {
            return Ok(Clustering {
                centroids: Vec::new(),
                assignments: Vec::new(),
                iterations: 0,
            });
        }

        let k = self.k.min(points.len());
        let mut centroids: Vec<Vec<f64>> = sample(rng, points.len(), k)
            .into_iter()
            .map(|i| points[i].to_vec())
            .collect();

        let mut assignments = vec![usize::MAX; points.len()];
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;

            let mut moved = false;
            for (slot, point) in assignments.iter_mut().zip(points) {
                let (nearest, _) = nearest_centroid(&centroids, point, self.metric)?;
                if *slot != nearest {
                    *slot = nearest;
                    moved = true;
                }
            }
            if !moved {
                break;
            }

            centroids = update_centroids(&centroids, points, &assignments);
        }

        Ok(Clustering {
            centroids,
            assignments,
            iterations,
        })
    }
}

/// Index and distance of the centroid closest to `point`. Ties go to the
/// lowest index.
pub fn nearest_centroid(
    centroids: &[Vec<f64>],
    point: &[f64],
    metric: DistanceMetric,
) -> Result<(usize, f64)> {
    let mut best = (0, f64::INFINITY);
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = metric.distance(point, centroid)?;
        if distance < best.1 {
            best = (i, distance);
        }
    }
    Ok(best)
}

/// Mean of each cluster's members; an empty cluster keeps its old centroid.
fn update_centroids(old: &[Vec<f64>], points: &[&[f64]], assignments: &[usize]) -> Vec<Vec<f64>> {
    let dimension = points.first().map_or(0, |p| p.len());
    let mut sums = vec![vec![0.0; dimension]; old.len()];
    let mut counts = vec![0usize; old.len()];

    for (point, &cluster) in points.iter().zip(assignments) {
        counts[cluster] += 1;
        for (sum, value) in sums[cluster].iter_mut().zip(point.iter()) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(old)
        .map(|((sum, count), previous)| {
            if count == 0 {
                previous.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}
