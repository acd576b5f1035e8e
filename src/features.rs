//! Feature selection.
//!
//! Picks the ordered list of columns that take part in clustering. The
//! canonical list wins when any of it is present; otherwise a positional
//! heuristic skips leading identifier columns, and as a last resort every
//! numeric column is used.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Positions taken by the fallback rule on wide datasets (skips id/category columns).
const POSITIONAL_FALLBACK: [usize; 3] = [2, 3, 4];

/// Datasets with at least this many columns use [`POSITIONAL_FALLBACK`].
const POSITIONAL_MIN_COLUMNS: usize = 5;

/// Ordered, non-empty list of selected column names.
///
/// Order fixes vector component order everywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct FeatureSet(Vec<String>);

impl TryFrom<Vec<String>> for FeatureSet {
    type Error = Error;

    fn try_from(names: Vec<String>) -> Result<Self> {
        FeatureSet::new(names)
    }
}

impl FeatureSet {
    /// Wrap a non-empty list of names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::NoUsableFeatures { columns: vec![] });
        }
        Ok(Self(names))
    }

    /// Feature names in order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the first feature whose name contains `needle` (case-insensitive).
    pub fn find(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_lowercase();
        self.0.iter().position(|n| n.to_lowercase().contains(&needle))
    }
}

/// Choose the clustering features of `dataset`.
///
/// 1. `canonical` intersected with the dataset's numeric columns, canonical order.
/// 2. With at least five columns: the numeric ones among positions 2, 3, 4.
/// 3. Otherwise: every numeric column.
pub fn select_features(dataset: &Dataset, canonical: &[String]) -> Result<FeatureSet> {
    let preferred: Vec<String> = canonical
        .iter()
        .filter(|name| {
            dataset
                .column_index(name)
                .is_some_and(|idx| dataset.is_numeric_column(idx))
        })
        .cloned()
        .collect();

    let selected = if !preferred.is_empty() {
        preferred
    } else if dataset.columns().len() >= POSITIONAL_MIN_COLUMNS {
        debug!(
            columns = dataset.columns().len(),
            "no canonical features present, using positional fallback"
        );
        POSITIONAL_FALLBACK
            .iter()
            .filter(|&&idx| dataset.is_numeric_column(idx))
            .map(|&idx| dataset.columns()[idx].clone())
            .collect()
    } else {
        debug!("no canonical features present, using all numeric columns");
        (0..dataset.columns().len())
            .filter(|&idx| dataset.is_numeric_column(idx))
            .map(|idx| dataset.columns()[idx].clone())
            .collect()
    };

    if selected.is_empty() {
        return Err(Error::NoUsableFeatures {
            columns: dataset.columns().to_vec(),
        });
    }
    Ok(FeatureSet(selected))
}
