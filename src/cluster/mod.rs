//! Centroid-based clustering.
//!
//! ## K-means
//!
//! The classic algorithm: assign each point to the nearest centroid, then
//! update centroids to the mean of their points. Repeat.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You know k in advance (use [`elbow_scan`] to justify one)
//!
//! ## Usage
//!
//! ```rust
//! use cohort::cluster::{Clustering, Kmeans};
//! use ndarray::array;
//!
//! let data = array![[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
//!
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);  // First two together
//! assert_ne!(labels[0], labels[2]);  // Separate from last two
//! ```

mod elbow;
mod kmeans;
mod model;
mod traits;

pub use elbow::{elbow_scan, ElbowPoint};
pub use kmeans::{dispersion, Kmeans, DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_SEED};
pub use model::{nearest_centroid, ClusterModel};
pub use traits::Clustering;
