//! Fitted partition.

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};

/// Result of one k-means fit, in scaled feature space.
///
/// Replaced wholesale by the next fit; never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    pub(crate) centroids: Array2<f64>,
    pub(crate) assignments: Vec<usize>,
    pub(crate) dispersion: f64,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

impl ClusterModel {
    /// Number of segments.
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Centroids, one row per segment.
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Segment index of every fitted row, in input order.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Within-cluster sum of squared distances (inertia).
    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    /// Lloyd iterations taken by the winning restart.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the winning restart stopped because assignments settled.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of fitted rows per segment.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.k()];
        for &a in &self.assignments {
            counts[a] += 1;
        }
        counts
    }

    /// Nearest segment for one scaled point.
    pub fn predict(&self, point: &[f64]) -> Result<usize> {
        if point.len() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: point.len(),
            });
        }
        Ok(nearest_centroid(ArrayView1::from(point), &self.centroids).0)
    }
}

/// Squared Euclidean distance.
#[inline]
pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of and squared distance to the nearest centroid.
///
/// Ties go to the lowest centroid index.
pub fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    (best, best_dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn equidistant_point_goes_to_lowest_index() {
        let centroids = array![[2.0, 0.0], [0.0, 0.0], [1.0, 5.0]];
        let (idx, dist) = nearest_centroid(ArrayView1::from(&[1.0, 0.0][..]), &centroids);
        assert_eq!(idx, 0);
        assert_eq!(dist, 1.0);

        let swapped = array![[0.0, 0.0], [2.0, 0.0]];
        let (idx, _) = nearest_centroid(ArrayView1::from(&[1.0, 0.0][..]), &swapped);
        assert_eq!(idx, 0);
    }

    #[test]
    fn duplicate_centroids_resolve_to_first() {
        let centroids = array![[3.0], [1.0], [1.0]];
        let (idx, _) = nearest_centroid(ArrayView1::from(&[1.0][..]), &centroids);
        assert_eq!(idx, 1);
    }

    #[test]
    fn predict_checks_dimension() {
        let model = ClusterModel {
            centroids: array![[0.0, 0.0], [5.0, 5.0]],
            assignments: vec![0, 1, 1],
            dispersion: 0.0,
            iterations: 1,
            converged: true,
        };
        assert_eq!(model.predict(&[4.0, 4.5]).unwrap(), 1);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert_eq!(model.counts(), vec![1, 2]);
    }
}
