//! Standardization to zero mean and unit variance.
//!
//! ```text
//! z = (x - μ) / σ          x = z·σ + μ
//! ```
//!
//! σ is the population standard deviation. Parameters are fitted once per
//! dataset load and then replayed on single vectors at classification time,
//! so the per-cell arithmetic in [`NormalizationParams::fit`] and
//! [`NormalizationParams::transform`] is the same expression.
//!
//! # Zero variance
//!
//! A constant column has σ = 0. [`ZeroVariancePolicy::Neutralize`] stores
//! σ = 1 for it, so every fitted row scales to exactly 0 and the column stops
//! contributing to distances. [`ZeroVariancePolicy::Reject`] fails the fit
//! with [`Error::DegenerateFeature`].

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::features::FeatureSet;

/// Relative tolerance under which a standard deviation counts as zero.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// What to do with a constant feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariancePolicy {
    /// Substitute σ = 1; the column scales to 0 for every fitted row.
    #[default]
    Neutralize,
    /// Fail with [`Error::DegenerateFeature`].
    Reject,
}

/// Per-feature (mean, standard deviation) pairs in feature order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl NormalizationParams {
    /// Fit parameters on `raw` (rows = records, columns = `features`) and
    /// return them with the scaled matrix.
    pub fn fit(
        raw: &Array2<f64>,
        features: &FeatureSet,
        policy: ZeroVariancePolicy,
    ) -> Result<(Self, Array2<f64>)> {
        let (n, d) = raw.dim();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if d != features.len() {
            return Err(Error::DimensionMismatch {
                expected: features.len(),
                found: d,
            });
        }

        let mut means = Vec::with_capacity(d);
        let mut stds = Vec::with_capacity(d);

        for (j, column) in raw.columns().into_iter().enumerate() {
            let first = column[0];
            let constant = column.iter().all(|&x| x == first);
            // Exact mean for constant columns so neutralized rows scale to exactly 0.
            let mean = if constant {
                first
            } else {
                column.sum() / n as f64
            };
            let var = column.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
            let std = var.sqrt();

            let std = if constant || std <= ZERO_VARIANCE_EPS * mean.abs().max(1.0) {
                let feature = features.names()[j].clone();
                match policy {
                    ZeroVariancePolicy::Reject => {
                        return Err(Error::DegenerateFeature { feature });
                    }
                    ZeroVariancePolicy::Neutralize => {
                        warn!(feature = %feature, mean, "zero-variance feature neutralized");
                        1.0
                    }
                }
            } else {
                std
            };

            means.push(mean);
            stds.push(std);
        }

        let params = Self { means, stds };
        let mut scaled = raw.clone();
        for mut row in scaled.rows_mut() {
            for (j, x) in row.iter_mut().enumerate() {
                *x = params.scale(j, *x);
            }
        }
        Ok((params, scaled))
    }

    /// Number of features these parameters cover.
    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Fitted means, in feature order.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted standard deviations (after the zero-variance policy), in feature order.
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    #[inline]
    fn scale(&self, j: usize, x: f64) -> f64 {
        (x - self.means[j]) / self.stds[j]
    }

    /// Scale one raw vector.
    pub fn transform(&self, raw: &[f64]) -> Result<Vec<f64>> {
        self.check_dim(raw.len())?;
        Ok(raw.iter().enumerate().map(|(j, &x)| self.scale(j, x)).collect())
    }

    /// Map one scaled vector back to original units.
    pub fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>> {
        self.check_dim(scaled.len())?;
        Ok(scaled
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&z, (&mean, &std))| z * std + mean)
            .collect())
    }

    /// Map every row of a scaled matrix (e.g. centroids) back to original units.
    pub fn inverse_transform_rows(&self, scaled: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_dim(scaled.ncols())?;
        let mut out = scaled.clone();
        for mut row in out.rows_mut() {
            for (j, z) in row.iter_mut().enumerate() {
                *z = *z * self.stds[j] + self.means[j];
            }
        }
        Ok(out)
    }

    fn check_dim(&self, found: usize) -> Result<()> {
        if found != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn features(n: usize) -> FeatureSet {
        FeatureSet::new((0..n).map(|i| format!("f{i}")).collect()).unwrap()
    }

    #[test]
    fn scaled_columns_have_zero_mean_unit_variance() {
        let raw = array![[1.0, 10.0], [2.0, 20.0], [3.0, 60.0], [4.0, 30.0]];
        let (params, scaled) =
            NormalizationParams::fit(&raw, &features(2), ZeroVariancePolicy::Reject).unwrap();

        assert!((params.means()[0] - 2.5).abs() < 1e-12);
        for column in scaled.columns() {
            let mean = column.sum() / 4.0;
            let var = column.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_column_rejected_under_reject_policy() {
        let raw = array![[0.1, 1.0], [0.1, 2.0], [0.1, 3.0]];
        let err = NormalizationParams::fit(&raw, &features(2), ZeroVariancePolicy::Reject)
            .unwrap_err();
        assert_eq!(
            err,
            Error::DegenerateFeature {
                feature: "f0".into()
            }
        );
    }

    #[test]
    fn constant_column_scales_to_zero_under_neutralize_policy() {
        let raw = array![[0.1, 1.0], [0.1, 2.0], [0.1, 3.0]];
        let (params, scaled) =
            NormalizationParams::fit(&raw, &features(2), ZeroVariancePolicy::Neutralize)
                .unwrap();
        assert_eq!(params.stds()[0], 1.0);
        assert!(scaled.column(0).iter().all(|&z| z == 0.0));
        assert_ne!(scaled[[0, 1]], 0.0);
    }

    #[test]
    fn transform_matches_fitted_rows_exactly() {
        let raw = array![[19.0, 15.0], [35.0, 70.0], [52.0, 120.0]];
        let (params, scaled) =
            NormalizationParams::fit(&raw, &features(2), ZeroVariancePolicy::Reject).unwrap();
        for (i, row) in raw.rows().into_iter().enumerate() {
            let z = params.transform(row.as_slice().unwrap()).unwrap();
            assert_eq!(z, scaled.row(i).to_vec());
        }
    }

    #[test]
    fn wrong_length_is_a_dimension_mismatch() {
        let raw = array![[1.0, 2.0], [3.0, 5.0]];
        let (params, _) =
            NormalizationParams::fit(&raw, &features(2), ZeroVariancePolicy::Reject).unwrap();
        assert_eq!(
            params.transform(&[1.0]).unwrap_err(),
            Error::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
        assert!(params.inverse_transform(&[1.0, 2.0, 3.0]).is_err());
    }

    proptest! {
        #[test]
        fn inverse_transform_undoes_transform(
            v in proptest::collection::vec(-1.0e4f64..1.0e4, 3),
        ) {
            let raw = array![[1.0, 100.0, -5.0], [4.0, 250.0, 0.0], [9.0, 175.0, 5.0]];
            let (params, _) =
                NormalizationParams::fit(&raw, &features(3), ZeroVariancePolicy::Reject).unwrap();
            let back = params.inverse_transform(&params.transform(&v).unwrap()).unwrap();
            for (a, b) in v.iter().zip(&back) {
                prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
            }
        }
    }
}
