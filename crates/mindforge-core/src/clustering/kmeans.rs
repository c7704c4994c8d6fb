//! Seeded k-means.
//!
//! k-means++ initialization driven by a `ChaCha8Rng` seeded from the config, then
//! Lloyd iterations until assignments stop changing or centroid movement
//! falls under `tolerance`. With `n_init > 1` the run with the lowest inertia
//! wins. Identical input and seed always give identical assignments.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::ClusteringError;

/// Tuning for a k-means fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub n_init: usize,
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 1,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }
}

/// Result of a fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per input point
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    pub iterations: usize,
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the closest centroid; ties go to the lower index
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// k-means++ seeding: first centre uniform, the rest proportional to D²
fn kmeans_plus_plus_init(
    points: &[Vec<f64>],
    k: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    let mut min_distances: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_distances.iter().sum();
        let chosen = if total <= f64::EPSILON {
            // Every point sits on a centre already (duplicate inputs)
            rng.gen_range(0..n)
        } else {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            min_distances
                .iter()
                .position(|&d| {
                    acc += d;
                    acc >= target
                })
                .unwrap_or(n - 1)
        };

        let centre = points[chosen].clone();
        for (slot, p) in min_distances.iter_mut().zip(points) {
            *slot = slot.min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, config: &KMeansConfig) -> KMeansFit {
    let dim = points[0].len();
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; points.len()];
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let mut changed = false;
        for (slot, p) in assignments.iter_mut().zip(points) {
            let (idx, _) = nearest(p, &centroids);
            if *slot != idx {
                *slot = idx;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(&counts) {
            // Empty clusters keep their previous centre
            if *count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.into_iter().map(|s| s / *count as f64).collect();
            shift += squared_distance(centroid, &updated);
            *centroid = updated;
        }

        if !changed || shift <= config.tolerance {
            break;
        }
    }

    // Final assignment against the settled centroids
    let mut inertia = 0.0;
    for (slot, p) in assignments.iter_mut().zip(points) {
        let (idx, d) = nearest(p, &centroids);
        *slot = idx;
        inertia += d;
    }

    KMeansFit {
        assignments,
        centroids,
        inertia,
        iterations,
    }
}

/// Partition `points` into `config.k` groups
pub fn fit(points: &[Vec<f64>], config: &KMeansConfig) -> Result<KMeansFit, ClusteringError> {
    if config.k == 0 {
        return Err(ClusteringError::InvalidClusterCount(0));
    }
    if points.len() < config.k {
        return Err(ClusteringError::TooFewSamples {
            k: config.k,
            samples: points.len(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;

    for _ in 0..config.n_init.max(1) {
        let init = kmeans_plus_plus_init(points, config.k, &mut rng);
        let run = lloyd(points, init, config);
        let better = best.as_ref().map_or(true, |b| run.inertia < b.inertia);
        if better {
            best = Some(run);
        }
    }

    best.ok_or(ClusteringError::InvalidClusterCount(config.k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
        ]
    }

    #[test]
    fn test_separates_two_blobs() {
        let fit = fit(&blobs(), &KMeansConfig::new(2)).unwrap();
        let a = fit.assignments[0];
        assert!(fit.assignments[..3].iter().all(|&c| c == a));
        assert!(fit.assignments[3..].iter().all(|&c| c != a));
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let config = KMeansConfig::new(3).with_seed(7).with_n_init(4);
        assert_eq!(fit(&blobs(), &config), fit(&blobs(), &config));
    }

    #[test]
    fn test_too_few_samples() {
        let err = fit(&blobs()[..1], &KMeansConfig::new(2)).unwrap_err();
        assert_eq!(err, ClusteringError::TooFewSamples { k: 2, samples: 1 });
    }

    #[test]
    fn test_zero_k_rejected() {
        assert_eq!(
            fit(&blobs(), &KMeansConfig::new(0)).unwrap_err(),
            ClusteringError::InvalidClusterCount(0)
        );
    }

    #[test]
    fn test_duplicate_points_do_not_panic() {
        let points = vec![vec![1.0, 1.0]; 4];
        let fit = fit(&points, &KMeansConfig::new(3)).unwrap();
        assert_eq!(fit.assignments.len(), 4);
        assert_eq!(fit.inertia, 0.0);
    }
}
