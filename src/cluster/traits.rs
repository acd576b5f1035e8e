//! Clustering traits.

use ndarray::Array2;

use super::model::ClusterModel;
use crate::error::Result;

/// Trait for hard, centroid-based partitioning algorithms.
pub trait Clustering {
    /// Fit the model to `data` (rows = points) and return the fitted partition.
    fn fit(&self, data: &Array2<f64>) -> Result<ClusterModel>;

    /// Fit and return only the cluster assignments, one per input row.
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.assignments().to_vec())
    }

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}
