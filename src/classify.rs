//! Classifying previously unseen records.
//!
//! A record arrives as named numeric fields. [`resolve_vector`] lines the
//! fields up with the feature set, filling gaps from substring-keyed
//! defaults; [`classify_raw`] then scales the vector with the fitted
//! normalization, picks the nearest centroid, and labels that one segment.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cluster::ClusterModel;
use crate::config::InputDefault;
use crate::error::{Error, Result};
use crate::features::FeatureSet;
use crate::label::SegmentLabeler;
use crate::normalize::NormalizationParams;

/// Named numeric fields of one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifyInput(BTreeMap<String, f64>);

impl ClassifyInput {
    /// Empty input; every feature falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    /// Value of a field, matched by exact name.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ClassifyInput {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// How the model used for a classification came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitOrigin {
    /// A model was already fitted.
    Existing,
    /// No model existed; one was fitted with the current k.
    OnDemand,
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Segment index in `0..k`.
    pub segment: usize,
    /// Label of that segment.
    pub label: String,
    /// Segment mean of every feature, original units.
    pub means: BTreeMap<String, f64>,
    /// Whether the model was fitted by this call.
    pub origin: FitOrigin,
}

/// Raw feature vector for `input`, in feature order.
///
/// Per feature: the field with the feature's exact name; else the first
/// default whose pattern occurs in the feature name (case-insensitive),
/// reading its field or falling back to its value; else 0.
pub fn resolve_vector(
    features: &FeatureSet,
    input: &ClassifyInput,
    defaults: &[InputDefault],
) -> Vec<f64> {
    features
        .names()
        .iter()
        .map(|name| {
            if let Some(v) = input.get(name) {
                return v;
            }
            let lower = name.to_lowercase();
            match defaults
                .iter()
                .find(|d| lower.contains(&d.pattern.to_lowercase()))
            {
                Some(d) => input.get(&d.field).unwrap_or(d.value),
                None => {
                    warn!(feature = %name, "no input or default for feature, using 0");
                    0.0
                }
            }
        })
        .collect()
}

/// Nearest segment for one raw vector, with its label and means row.
pub(crate) fn classify_raw(
    raw: &[f64],
    model: &ClusterModel,
    params: &NormalizationParams,
    means: &Array2<f64>,
    features: &FeatureSet,
    labeler: &SegmentLabeler,
) -> Result<(usize, String, BTreeMap<String, f64>)> {
    if raw.len() != features.len() {
        return Err(Error::DimensionMismatch {
            expected: features.len(),
            found: raw.len(),
        });
    }
    let scaled = params.transform(raw)?;
    let segment = model.predict(&scaled)?;
    let row = means.row(segment);
    let label = labeler.label_one(segment, row, features);
    let means = features
        .names()
        .iter()
        .cloned()
        .zip(row.iter().copied())
        .collect();
    Ok((segment, label, means))
}
