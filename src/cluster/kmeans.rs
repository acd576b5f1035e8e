//! K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (WCSS, also called inertia or dispersion).
//!
//! # The Objective
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids via k-means++
//! 2. **Assign**: each point → nearest centroid (ties → lowest index)
//! 3. **Update**: each centroid → mean of assigned points
//! 4. Repeat until no assignment changes, or `max_iter` is reached
//!
//! A centroid that ends an update step with no points is reseeded to the
//! point farthest from every other centroid, so k stays honest.
//!
//! ## K-means++ Initialization
//!
//! 1. Choose first centroid uniformly at random
//! 2. Choose next centroid with probability proportional to D(x)²
//!    (squared distance to nearest existing centroid)
//!
//! # Restarts
//!
//! Lloyd only finds a local minimum, so the whole procedure runs `n_init`
//! times from independent seedings and the lowest-WCSS run is kept. Restart
//! seeds are drawn from one master RNG seeded with `seed`, which makes a fit
//! a pure function of (data, k, seed, n_init, max_iter).

use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::model::{nearest_centroid, squared_distance, ClusterModel};
use super::traits::Clustering;
use crate::error::{Error, Result};

/// Default Lloyd iteration cap.
pub const DEFAULT_MAX_ITER: usize = 300;
/// Default number of restarts.
pub const DEFAULT_N_INIT: usize = 10;
/// Default master seed.
pub const DEFAULT_SEED: u64 = 42;

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum Lloyd iterations per restart.
    max_iter: usize,
    /// Number of independent restarts.
    n_init: usize,
    /// Master random seed.
    seed: u64,
}

struct Run {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    dispersion: f64,
    iterations: usize,
    converged: bool,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: DEFAULT_MAX_ITER,
            n_init: DEFAULT_N_INIT,
            seed: DEFAULT_SEED,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the number of restarts.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initialize centroids using k-means++ algorithm.
    fn init_centroids(&self, data: &Array2<f64>, rng: &mut impl Rng) -> Array2<f64> {
        let n = data.nrows();
        let d = data.ncols();
        let mut centroids = Array2::zeros((self.k, d));

        // First centroid: random point
        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        // D(x)² to the nearest chosen centroid, updated incrementally.
        let mut distances: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|p| squared_distance(p, centroids.row(0)))
            .collect();

        for i in 1..self.k {
            let total: f64 = distances.iter().sum();
            let selected = if total <= 0.0 {
                // Every point coincides with a chosen centroid.
                rng.random_range(0..n)
            } else {
                let threshold = rng.random::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = distances
                    .iter()
                    .rposition(|&d| d > 0.0)
                    .unwrap_or(n - 1);
                for (j, &dist) in distances.iter().enumerate() {
                    if dist <= 0.0 {
                        continue;
                    }
                    cumsum += dist;
                    if cumsum >= threshold {
                        selected = j;
                        break;
                    }
                }
                selected
            };

            centroids.row_mut(i).assign(&data.row(selected));
            for (j, point) in data.rows().into_iter().enumerate() {
                let dist = squared_distance(point, centroids.row(i));
                if dist < distances[j] {
                    distances[j] = dist;
                }
            }
        }

        centroids
    }

    /// Assignment step. Returns whether any label changed.
    fn assign(data: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> bool {
        #[cfg(feature = "parallel")]
        let nearest: Vec<usize> = (0..data.nrows())
            .into_par_iter()
            .map(|i| nearest_centroid(data.row(i), centroids).0)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let nearest: Vec<usize> = data
            .rows()
            .into_iter()
            .map(|point| nearest_centroid(point, centroids).0)
            .collect();

        let mut changed = false;
        for (label, best) in labels.iter_mut().zip(nearest) {
            if *label != best {
                *label = best;
                changed = true;
            }
        }
        changed
    }

    /// Update step: centroids become member means; empty clusters are reseeded.
    fn update(&self, data: &Array2<f64>, labels: &[usize], centroids: &mut Array2<f64>) {
        let d = data.ncols();
        let mut sums = Array2::<f64>::zeros((self.k, d));
        let mut counts = vec![0usize; self.k];

        for (point, &c) in data.rows().into_iter().zip(labels) {
            let mut row = sums.row_mut(c);
            row += &point;
            counts[c] += 1;
        }

        let mut empty = Vec::new();
        for c in 0..self.k {
            if counts[c] > 0 {
                let mean = sums.row(c).mapv(|x| x / counts[c] as f64);
                centroids.row_mut(c).assign(&mean);
            } else {
                empty.push(c);
            }
        }

        if empty.is_empty() {
            return;
        }

        let mut placed: Vec<bool> = counts.iter().map(|&n| n > 0).collect();
        for c in empty {
            let (far, far_dist) = farthest_point(data, centroids, &placed);
            debug!(cluster = c, point = far, distance = far_dist, "reseeding empty cluster");
            centroids.row_mut(c).assign(&data.row(far));
            placed[c] = true;
        }
    }

    fn run_once(&self, data: &Array2<f64>, rng: &mut impl Rng) -> Run {
        let mut centroids = self.init_centroids(data, rng);
        let mut labels = vec![usize::MAX; data.nrows()];
        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.max_iter {
            iterations += 1;
            if !Self::assign(data, &centroids, &mut labels) {
                converged = true;
                break;
            }
            self.update(data, &labels, &mut centroids);
        }

        if !converged {
            // Last step was an update; keep labels consistent with final centroids.
            Self::assign(data, &centroids, &mut labels);
        }

        let dispersion = data
            .rows()
            .into_iter()
            .zip(&labels)
            .map(|(point, &c)| squared_distance(point, centroids.row(c)))
            .sum();

        Run {
            centroids,
            labels,
            dispersion,
            iterations,
            converged,
        }
    }
}

/// Point with the largest distance to its nearest `placed` centroid.
///
/// Ties go to the lowest point index.
fn farthest_point(data: &Array2<f64>, centroids: &Array2<f64>, placed: &[bool]) -> (usize, f64) {
    let mut far = 0;
    let mut far_dist = f64::NEG_INFINITY;
    for (i, point) in data.rows().into_iter().enumerate() {
        let nearest = centroids
            .rows()
            .into_iter()
            .zip(placed)
            .filter(|(_, p)| **p)
            .map(|(c, _)| squared_distance(point, c))
            .fold(f64::INFINITY, f64::min);
        if nearest > far_dist {
            far_dist = nearest;
            far = i;
        }
    }
    (far, far_dist)
}

impl Clustering for Kmeans {
    fn fit(&self, data: &Array2<f64>) -> Result<ClusterModel> {
        let n = data.nrows();
        if n == 0 || data.ncols() == 0 {
            return Err(Error::EmptyInput);
        }
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.n_init == 0 {
            return Err(Error::InvalidParameter {
                name: "n_init",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1".to_string(),
            });
        }

        let mut master = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Run> = None;

        for restart in 0..self.n_init {
            let mut rng = StdRng::seed_from_u64(master.random::<u64>());
            let run = self.run_once(data, &mut rng);
            debug!(
                k = self.k,
                restart,
                dispersion = run.dispersion,
                iterations = run.iterations,
                converged = run.converged,
                "k-means restart finished"
            );
            // Strict comparison: the earliest restart wins ties.
            if best.as_ref().map_or(true, |b| run.dispersion < b.dispersion) {
                best = Some(run);
            }
        }

        let best = best.ok_or(Error::EmptyInput)?;
        Ok(ClusterModel {
            centroids: best.centroids,
            assignments: best.labels,
            dispersion: best.dispersion,
            iterations: best.iterations,
            converged: best.converged,
        })
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Dispersion of `data` against arbitrary `centroids` (nearest-centroid assignment).
pub fn dispersion(data: &Array2<f64>, centroids: &Array2<f64>) -> f64 {
    data.rows()
        .into_iter()
        .map(|point: ArrayView1<'_, f64>| nearest_centroid(point, centroids).1)
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn two_blobs() -> Array2<f64> {
        array![[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]]
    }

    #[test]
    fn test_kmeans_basic() {
        let labels = Kmeans::new(2).with_seed(42).fit_predict(&two_blobs()).unwrap();

        // Points 0,1 should be in same cluster, points 2,3 in another
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_one_dimensional_income_split() {
        let data = array![[10.0], [12.0], [90.0], [95.0], [91.0]];
        for seed in [0, 1, 7, 42, 1234] {
            let model = Kmeans::new(2).with_seed(seed).fit(&data).unwrap();
            let a = model.assignments();
            assert_eq!(a[0], a[1], "seed {seed}");
            assert_eq!(a[2], a[3], "seed {seed}");
            assert_eq!(a[2], a[4], "seed {seed}");
            assert_ne!(a[0], a[2], "seed {seed}");
        }
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let model = Kmeans::new(3).with_seed(42).fit(&data).unwrap();

        let unique: HashSet<_> = model.assignments().iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(model.dispersion(), 0.0);
    }

    #[test]
    fn test_kmeans_single_cluster_is_the_mean() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 9.0]];
        let model = Kmeans::new(1).fit(&data).unwrap();
        assert_eq!(model.assignments(), &[0, 0, 0]);
        assert!((model.centroids()[[0, 0]] - 3.0).abs() < 1e-12);
        assert!((model.centroids()[[0, 1]] - 5.0).abs() < 1e-12);
        assert!(model.converged());
    }

    #[test]
    fn test_kmeans_more_clusters_than_distinct_points() {
        // k-means++ runs out of positive-distance candidates; the fit must still succeed.
        let data = array![[1.0], [1.0], [1.0], [5.0]];
        let model = Kmeans::new(3).with_seed(3).fit(&data).unwrap();
        assert_eq!(model.k(), 3);
        assert!(model.assignments().iter().all(|&a| a < 3));
        assert_eq!(model.dispersion(), 0.0);
    }

    #[test]
    fn test_kmeans_dispersion_matches_centroids() {
        let data = two_blobs();
        let model = Kmeans::new(2).fit(&data).unwrap();
        assert!((dispersion(&data, model.centroids()) - model.dispersion()).abs() < 1e-12);
        assert!((model.dispersion() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_kmeans_iteration_cap_still_assigns_consistently() {
        let data: Array2<f64> =
            Array2::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let model = Kmeans::new(4).with_max_iter(1).with_n_init(1).fit(&data).unwrap();
        assert_eq!(model.iterations(), 1);
        for (i, &a) in model.assignments().iter().enumerate() {
            assert_eq!(nearest_centroid(data.row(i), model.centroids()).0, a);
        }
    }

    #[test]
    fn test_kmeans_invalid_cluster_count() {
        let data = array![[0.0, 0.0], [1.0, 1.0]];
        assert_eq!(
            Kmeans::new(5).fit(&data).unwrap_err(),
            Error::InvalidClusterCount {
                requested: 5,
                n_items: 2
            }
        );
        assert!(matches!(
            Kmeans::new(0).fit(&data),
            Err(Error::InvalidClusterCount { requested: 0, .. })
        ));
    }

    #[test]
    fn test_kmeans_rejects_zero_restarts() {
        let err = Kmeans::new(1).with_n_init(0).fit(&two_blobs()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "n_init", .. }));
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let data = Array2::<f64>::zeros((0, 2));
        assert_eq!(Kmeans::new(1).fit(&data).unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn test_farthest_point_ignores_unplaced_centroids() {
        let data = array![[0.0], [1.0], [10.0]];
        let centroids = array![[0.0], [10.0]];
        let (far, dist) = farthest_point(&data, &centroids, &[true, false]);
        assert_eq!(far, 2);
        assert_eq!(dist, 100.0);
    }

    #[test]
    fn test_kmeans_empty_cluster_is_reseeded_until_all_have_members() {
        let data = array![[0.0], [1.0], [2.0], [10.0]];
        let km = Kmeans::new(3);
        // Cluster 2 starts with no members.
        let mut labels = vec![0, 0, 1, 1];
        let mut centroids = array![[0.0], [0.0], [0.0]];

        km.update(&data, &labels, &mut centroids);
        assert_eq!(centroids, array![[0.5], [6.0], [10.0]]);

        // Cluster 1 empties on the next pass and is reseeded in turn.
        let mut converged = false;
        for _ in 0..10 {
            if !Kmeans::assign(&data, &centroids, &mut labels) {
                converged = true;
                break;
            }
            km.update(&data, &labels, &mut centroids);
        }
        assert!(converged);
        assert_eq!(labels, vec![1, 0, 0, 2]);

        let mut counts = [0usize; 3];
        for &c in &labels {
            counts[c] += 1;
        }
        assert!(counts.iter().all(|&n| n > 0), "{counts:?}");
    }

    fn matrix() -> impl Strategy<Value = Array2<f64>> {
        (2usize..30, 1usize..4).prop_flat_map(|(n, d)| {
            proptest::collection::vec(-100.0f64..100.0, n * d)
                .prop_map(move |flat| Array2::from_shape_vec((n, d), flat).unwrap())
        })
    }

    proptest! {
        #[test]
        fn every_point_gets_one_valid_label(data in matrix(), k in 1usize..6) {
            let k = k.min(data.nrows());
            let model = Kmeans::new(k).with_n_init(3).fit(&data).unwrap();
            prop_assert_eq!(model.assignments().len(), data.nrows());
            prop_assert!(model.assignments().iter().all(|&a| a < k));
            prop_assert_eq!(model.centroids().nrows(), k);
        }

        #[test]
        fn same_seed_same_model(data in matrix(), k in 1usize..5, seed in any::<u64>()) {
            let k = k.min(data.nrows());
            let a = Kmeans::new(k).with_seed(seed).with_n_init(2).fit(&data).unwrap();
            let b = Kmeans::new(k).with_seed(seed).with_n_init(2).fit(&data).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
