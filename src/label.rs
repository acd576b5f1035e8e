//! Rule-based segment labels.
//!
//! Each segment is described by the mean of two designated features in
//! original units: a *value* feature (income-like) and an *engagement*
//! feature (spending-score-like). An ordered rule table maps those means to a
//! label; the first matching rule wins, so rule order is part of the table's
//! meaning. When either feature is missing, or nothing matches, the segment
//! gets a generic `"Group N"` label (N counts from 1).

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterModel;
use crate::error::{Error, Result};
use crate::features::FeatureSet;
use crate::normalize::NormalizationParams;

/// Which designated feature a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Income-like feature.
    Value,
    /// Spending-score-like feature.
    Engagement,
}

/// Predicate over a segment's (value, engagement) means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Strictly greater than `cutoff`.
    Above { metric: Metric, cutoff: f64 },
    /// Strictly less than `cutoff`.
    Below { metric: Metric, cutoff: f64 },
    /// Inside `[lo, hi]`.
    Within { metric: Metric, lo: f64, hi: f64 },
    /// Every inner condition holds.
    All { of: Vec<Condition> },
    /// Always holds.
    Always,
}

impl Condition {
    fn holds(&self, value: f64, engagement: f64) -> bool {
        let read = |m: &Metric| match m {
            Metric::Value => value,
            Metric::Engagement => engagement,
        };
        match self {
            Condition::Above { metric, cutoff } => read(metric) > *cutoff,
            Condition::Below { metric, cutoff } => read(metric) < *cutoff,
            Condition::Within { metric, lo, hi } => {
                let x = read(metric);
                *lo <= x && x <= *hi
            }
            Condition::All { of } => of.iter().all(|c| c.holds(value, engagement)),
            Condition::Always => true,
        }
    }
}

/// One row of the decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Condition on the segment's designated means.
    pub when: Condition,
    /// Label given when `when` holds.
    pub label: String,
}

impl LabelRule {
    /// Rule labelling segments that satisfy `when`.
    pub fn new(when: Condition, label: impl Into<String>) -> Self {
        Self {
            when,
            label: label.into(),
        }
    }
}

fn above(metric: Metric, cutoff: f64) -> Condition {
    Condition::Above { metric, cutoff }
}

fn below(metric: Metric, cutoff: f64) -> Condition {
    Condition::Below { metric, cutoff }
}

fn both(a: Condition, b: Condition) -> Condition {
    Condition::All { of: vec![a, b] }
}

/// Ordered decision table, first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRules {
    rules: Vec<LabelRule>,
}

impl LabelRules {
    /// Build a table from rules in evaluation order.
    pub fn new(rules: Vec<LabelRule>) -> Self {
        Self { rules }
    }

    /// Segment-profile table used for fitted summaries.
    ///
    /// High means above 75, low means below 35 (original units); the balanced
    /// band is 40..=75 on both; the engagement midpoint is 50.
    pub fn standard() -> Self {
        use Metric::{Engagement, Value};
        Self::new(vec![
            LabelRule::new(both(above(Value, 75.0), above(Engagement, 75.0)), "VIP Cluster"),
            LabelRule::new(both(above(Value, 75.0), below(Engagement, 35.0)), "Savers"),
            LabelRule::new(both(below(Value, 35.0), above(Engagement, 75.0)), "Big Spenders"),
            LabelRule::new(both(below(Value, 35.0), below(Engagement, 35.0)), "Frugals"),
            LabelRule::new(
                both(
                    Condition::Within {
                        metric: Value,
                        lo: 40.0,
                        hi: 75.0,
                    },
                    Condition::Within {
                        metric: Engagement,
                        lo: 40.0,
                        hi: 75.0,
                    },
                ),
                "Balanced Clients",
            ),
            LabelRule::new(above(Engagement, 50.0), "Active Shoppers"),
            LabelRule::new(below(Engagement, 50.0), "Value Seekers"),
        ])
    }

    /// Quick-prediction table: 60/40 cutoffs and a catch-all.
    pub fn coarse() -> Self {
        use Metric::{Engagement, Value};
        Self::new(vec![
            LabelRule::new(both(above(Value, 60.0), above(Engagement, 60.0)), "The VIPs"),
            LabelRule::new(both(above(Value, 60.0), below(Engagement, 40.0)), "The Savers"),
            LabelRule::new(both(below(Value, 40.0), above(Engagement, 60.0)), "The Big Spenders"),
            LabelRule::new(both(below(Value, 40.0), below(Engagement, 40.0)), "The Frugals"),
            LabelRule::new(Condition::Always, "The Average Joes"),
        ])
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }

    /// First matching label, if any.
    pub fn evaluate(&self, value: f64, engagement: f64) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.when.holds(value, engagement))
            .map(|r| r.label.as_str())
    }
}

impl Default for LabelRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Segment index → label, covering `0..k` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentLabel(BTreeMap<usize, String>);

impl SegmentLabel {
    /// Label of one segment.
    pub fn get(&self, segment: usize) -> Option<&str> {
        self.0.get(&segment).map(String::as_str)
    }

    /// Number of labelled segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only for a model with no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (segment, label) pairs in segment order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(&k, v)| (k, v.as_str()))
    }
}

/// Generic display label for a segment index.
pub fn generic_label(segment: usize) -> String {
    format!("Group {}", segment + 1)
}

/// Turns per-segment feature means into labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentLabeler {
    /// Decision table.
    pub rules: LabelRules,
    /// Substrings identifying the value feature (case-insensitive, first hit wins).
    pub value_keys: Vec<String>,
    /// Substrings identifying the engagement feature.
    pub engagement_keys: Vec<String>,
}

impl Default for SegmentLabeler {
    fn default() -> Self {
        Self {
            rules: LabelRules::standard(),
            value_keys: vec!["income".into()],
            engagement_keys: vec!["spending".into(), "score".into()],
        }
    }
}

impl SegmentLabeler {
    pub fn with_rules(mut self, rules: LabelRules) -> Self {
        self.rules = rules;
        self
    }

    fn locate(features: &FeatureSet, keys: &[String]) -> Option<usize> {
        keys.iter().find_map(|k| features.find(k))
    }

    /// Positions of the (value, engagement) features, if both can be identified.
    pub fn designated(&self, features: &FeatureSet) -> Option<(usize, usize)> {
        let value = Self::locate(features, &self.value_keys)?;
        let engagement = Self::locate(features, &self.engagement_keys)?;
        Some((value, engagement))
    }

    /// Label for one segment from its mean vector (original units, feature order).
    pub fn label_one(
        &self,
        segment: usize,
        means: ArrayView1<'_, f64>,
        features: &FeatureSet,
    ) -> String {
        self.designated(features)
            .and_then(|(v, e)| self.rules.evaluate(means[v], means[e]))
            .map(str::to_string)
            .unwrap_or_else(|| generic_label(segment))
    }

    /// Labels for every row of `means` (one row per segment).
    pub fn label(&self, means: &Array2<f64>, features: &FeatureSet) -> Result<SegmentLabel> {
        if means.ncols() != features.len() {
            return Err(Error::DimensionMismatch {
                expected: features.len(),
                found: means.ncols(),
            });
        }
        Ok(SegmentLabel(
            means
                .rows()
                .into_iter()
                .enumerate()
                .map(|(segment, row)| (segment, self.label_one(segment, row, features)))
                .collect(),
        ))
    }
}

/// Per-segment feature means in original units, one row per segment.
///
/// A segment with no members falls back to its centroid mapped back to
/// original units.
pub fn segment_means(
    model: &ClusterModel,
    raw: &Array2<f64>,
    params: &NormalizationParams,
) -> Result<Array2<f64>> {
    if raw.nrows() != model.assignments().len() {
        return Err(Error::ShapeMismatch {
            expected: format!("{} rows", model.assignments().len()),
            actual: format!("{} rows", raw.nrows()),
        });
    }
    let k = model.k();
    let mut sums = Array2::<f64>::zeros((k, raw.ncols()));
    let counts = model.counts();
    for (row, &c) in raw.rows().into_iter().zip(model.assignments()) {
        let mut acc = sums.row_mut(c);
        acc += &row;
    }

    let centroids = params.inverse_transform_rows(model.centroids())?;
    for (c, mut row) in sums.rows_mut().into_iter().enumerate() {
        if counts[c] == 0 {
            row.assign(&centroids.row(c));
        } else {
            row.mapv_inplace(|x| x / counts[c] as f64);
        }
    }
    Ok(sums)
}
