//! Presentation payloads derived from a fitted model.
//!
//! Nothing here renders; these are the numbers a chart or report needs,
//! in original feature units.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterModel;
use crate::error::{Error, Result};
use crate::features::FeatureSet;
use crate::label::SegmentLabel;
use crate::normalize::NormalizationParams;

/// Segment colors, in segment order.
pub const PALETTE: [&str; 10] = [
    "#13A4EC", "#A855F7", "#22C55E", "#F59E0B", "#EF4444", "#06B6D4", "#6366F1", "#EC4899",
    "#84CC16", "#F97316",
];

/// Colors for `k` segments, cycling through [`PALETTE`].
pub fn palette(k: usize) -> Vec<String> {
    PALETTE.iter().cycle().take(k).map(|c| c.to_string()).collect()
}

fn rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|r| r.to_vec()).collect()
}

/// Everything a caller needs to describe a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    /// Number of segments.
    pub k: usize,
    /// Within-segment sum of squared distances, in scaled units.
    pub dispersion: f64,
    /// Lloyd iterations of the winning restart.
    pub iterations: usize,
    /// Whether the winning restart stopped on stable assignments.
    pub converged: bool,
    /// Feature names, fixing the column order of `centroids` and `means`.
    pub features: Vec<String>,
    /// Centroids in original units, one row per segment.
    pub centroids: Vec<Vec<f64>>,
    /// Member means in original units, one row per segment.
    pub means: Vec<Vec<f64>>,
    /// Fraction of records in each segment.
    pub sizes: Vec<f64>,
    /// Display name of each segment.
    pub labels: SegmentLabel,
    /// Display color of each segment.
    pub colors: Vec<String>,
}

impl SegmentSummary {
    pub(crate) fn build(
        model: &ClusterModel,
        params: &NormalizationParams,
        features: &FeatureSet,
        means: &Array2<f64>,
        labels: &SegmentLabel,
    ) -> Result<Self> {
        let centroids = params.inverse_transform_rows(model.centroids())?;
        let n = model.assignments().len() as f64;
        Ok(Self {
            k: model.k(),
            dispersion: model.dispersion(),
            iterations: model.iterations(),
            converged: model.converged(),
            features: features.names().to_vec(),
            centroids: rows(&centroids),
            means: rows(means),
            sizes: model.counts().into_iter().map(|c| c as f64 / n).collect(),
            labels: labels.clone(),
            colors: palette(model.k()),
        })
    }
}

/// Which pair of features a scatter view plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterView {
    /// Income on x, spending score on y.
    #[default]
    IncomeVsScore,
    /// Age on x, income on y.
    AgeVsIncome,
}

impl ScatterView {
    /// Feature positions for (x, y).
    ///
    /// Income defaults to the second-to-last feature, spending to the last,
    /// age to the first, when the name lookup finds nothing.
    pub fn axes(self, features: &FeatureSet) -> (usize, usize) {
        let d = features.len();
        let income = features.find("income").unwrap_or(d.saturating_sub(2));
        let spending = features.find("spending").unwrap_or(d.saturating_sub(1));
        let age = features.find("age").unwrap_or(0);
        match self {
            ScatterView::IncomeVsScore => (income, spending),
            ScatterView::AgeVsIncome => (age, income),
        }
    }
}

/// Two-feature projection of records and centroids, original units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterData {
    /// Feature plotted on x.
    pub x_feature: String,
    /// Feature plotted on y.
    pub y_feature: String,
    /// One (x, y) per record, in dataset order.
    pub points: Vec<[f64; 2]>,
    /// Segment of each point.
    pub assignments: Vec<usize>,
    /// One (x, y) per segment.
    pub centroids: Vec<[f64; 2]>,
    /// Display color of each segment.
    pub colors: Vec<String>,
}

impl ScatterData {
    pub(crate) fn build(
        view: ScatterView,
        model: &ClusterModel,
        raw: &Array2<f64>,
        params: &NormalizationParams,
        features: &FeatureSet,
    ) -> Result<Self> {
        if raw.nrows() != model.assignments().len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} rows", model.assignments().len()),
                actual: format!("{} rows", raw.nrows()),
            });
        }
        let (x, y) = view.axes(features);
        let centroids = params.inverse_transform_rows(model.centroids())?;
        let project = |m: &Array2<f64>| -> Vec<[f64; 2]> {
            m.rows().into_iter().map(|r| [r[x], r[y]]).collect()
        };
        Ok(Self {
            x_feature: features.names()[x].clone(),
            y_feature: features.names()[y].clone(),
            points: project(raw),
            assignments: model.assignments().to_vec(),
            centroids: project(&centroids),
            colors: palette(model.k()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_past_ten() {
        let colors = palette(12);
        assert_eq!(colors.len(), 12);
        assert_eq!(colors[10], PALETTE[0]);
        assert_eq!(colors[11], PALETTE[1]);
        assert_eq!(palette(3), vec!["#13A4EC", "#A855F7", "#22C55E"]);
    }

    #[test]
    fn axes_resolve_by_name_then_position() {
        let mall = FeatureSet::new(vec![
            "Age".into(),
            "Annual Income (k$)".into(),
            "Spending Score (1-100)".into(),
        ])
        .unwrap();
        assert_eq!(ScatterView::IncomeVsScore.axes(&mall), (1, 2));
        assert_eq!(ScatterView::AgeVsIncome.axes(&mall), (0, 1));

        let other = FeatureSet::new(vec!["tenure".into(), "charges".into(), "calls".into()]).unwrap();
        assert_eq!(ScatterView::IncomeVsScore.axes(&other), (1, 2));

        let single = FeatureSet::new(vec!["x".into()]).unwrap();
        assert_eq!(ScatterView::IncomeVsScore.axes(&single), (0, 0));
    }
}
