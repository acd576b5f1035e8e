//! Elbow scan: dispersion as a function of k.
//!
//! Fits one throwaway model per candidate k and reports its dispersion.
//! Picking the elbow is left to the caller; nothing here chooses a k.

use std::ops::RangeInclusive;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::traits::Clustering;
use crate::error::{Error, Result};

/// One point of the elbow curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    /// Number of clusters.
    pub k: usize,
    /// Within-cluster sum of squares at this k.
    pub dispersion: f64,
}

/// Fit `make(k)` for every k in `ks`, in ascending order.
///
/// `ks` must be non-empty and start at 1 or above. Fails with the first
/// fitting error (e.g. [`Error::InvalidClusterCount`] for k past the row count).
pub fn elbow_scan<C, F>(
    data: &Array2<f64>,
    ks: RangeInclusive<usize>,
    make: F,
) -> Result<Vec<ElbowPoint>>
where
    C: Clustering,
    F: Fn(usize) -> C,
{
    if ks.is_empty() || *ks.start() == 0 {
        return Err(Error::InvalidParameter {
            name: "k_range",
            message: format!("expected an ascending range starting at 1 or above, got {ks:?}"),
        });
    }

    ks.map(|k| {
        let model = make(k).fit(data)?;
        Ok(ElbowPoint {
            k,
            dispersion: model.dispersion(),
        })
    })
    .collect()
}
