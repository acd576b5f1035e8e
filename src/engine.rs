//! The segmentation engine: loaded data, fitted model, and the operations
//! that read or replace them.
//!
//! State lives behind one [`parking_lot::RwLock`]. Loads and fits replace
//! their part wholesale under the write lock; everything else reads a
//! consistent pair of `Arc` snapshots, so a classification never sees a new
//! normalization against an old model.

use std::ops::RangeInclusive;
use std::sync::Arc;

use ndarray::Array2;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::classify::{classify_raw, resolve_vector, Classification, ClassifyInput, FitOrigin};
use crate::cluster::{elbow_scan, ClusterModel, Clustering, ElbowPoint};
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::features::{select_features, FeatureSet};
use crate::label::{segment_means, SegmentLabel};
use crate::normalize::NormalizationParams;
use crate::summary::{ScatterData, ScatterView, SegmentSummary};

/// Everything derived from one dataset load.
#[derive(Debug)]
struct LoadedData {
    dataset: Dataset,
    features: FeatureSet,
    params: NormalizationParams,
    raw: Array2<f64>,
    scaled: Array2<f64>,
}

/// A model plus what is derived from it.
#[derive(Debug)]
struct FittedModel {
    model: ClusterModel,
    means: Array2<f64>,
    labels: SegmentLabel,
}

#[derive(Debug)]
struct EngineState {
    data: Option<Arc<LoadedData>>,
    model: Option<Arc<FittedModel>>,
    /// k of the latest successful fit (or the configured default).
    current_k: usize,
}

/// Segmentation engine context.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    state: RwLock<EngineState>,
}

impl Engine {
    /// Create an engine with no data loaded.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let current_k = config.default_k;
        Ok(Self {
            config,
            state: RwLock::new(EngineState {
                data: None,
                model: None,
                current_k,
            }),
        })
    }

    /// Configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Select features, standardize, and replace the loaded data.
    ///
    /// On failure the previous data and model are kept. On success any
    /// fitted model is dropped, since it describes the old data.
    pub fn load_dataset(&self, dataset: Dataset) -> Result<FeatureSet> {
        let features = select_features(&dataset, &self.config.canonical_features)?;
        let raw = dataset.feature_matrix(&features)?;
        let (params, scaled) =
            NormalizationParams::fit(&raw, &features, self.config.zero_variance)?;

        info!(
            rows = dataset.len(),
            features = ?features.names(),
            "dataset loaded"
        );

        let loaded = Arc::new(LoadedData {
            dataset,
            features: features.clone(),
            params,
            raw,
            scaled,
        });
        let mut state = self.state.write();
        state.data = Some(loaded);
        state.model = None;
        Ok(features)
    }

    fn data(&self) -> Result<Arc<LoadedData>> {
        self.state.read().data.clone().ok_or(Error::DataNotLoaded)
    }

    /// Features of the loaded dataset.
    pub fn features(&self) -> Result<FeatureSet> {
        Ok(self.data()?.features.clone())
    }

    /// Number of records in the loaded dataset.
    pub fn row_count(&self) -> Result<usize> {
        Ok(self.data()?.dataset.len())
    }

    /// Normalization parameters of the loaded dataset.
    pub fn normalization(&self) -> Result<NormalizationParams> {
        Ok(self.data()?.params.clone())
    }

    /// Whether a model for the loaded data exists.
    pub fn is_fitted(&self) -> bool {
        self.state.read().model.is_some()
    }

    /// k the next on-demand fit would use.
    pub fn current_k(&self) -> usize {
        self.state.read().current_k
    }

    fn fit_data(&self, data: &LoadedData, k: usize) -> Result<FittedModel> {
        let model = self.config.kmeans(k).fit(&data.scaled)?;
        let means = segment_means(&model, &data.raw, &data.params)?;
        let labels = self.config.labeler.label(&means, &data.features)?;
        info!(
            k,
            seed = self.config.seed,
            dispersion = model.dispersion(),
            iterations = model.iterations(),
            converged = model.converged(),
            "segmentation model fitted"
        );
        Ok(FittedModel {
            model,
            means,
            labels,
        })
    }

    /// Fit a model with `k` segments, replacing the current one.
    pub fn fit(&self, k: usize) -> Result<SegmentSummary> {
        let mut state = self.state.write();
        let data = state.data.clone().ok_or(Error::DataNotLoaded)?;
        let fitted = self.fit_data(&data, k)?;
        let summary = Self::summarize(&data, &fitted)?;
        state.model = Some(Arc::new(fitted));
        state.current_k = k;
        Ok(summary)
    }

    fn summarize(data: &LoadedData, fitted: &FittedModel) -> Result<SegmentSummary> {
        SegmentSummary::build(
            &fitted.model,
            &data.params,
            &data.features,
            &fitted.means,
            &fitted.labels,
        )
    }

    fn snapshot(&self) -> Result<(Arc<LoadedData>, Arc<FittedModel>)> {
        let state = self.state.read();
        let data = state.data.clone().ok_or(Error::DataNotLoaded)?;
        let model = state.model.clone().ok_or(Error::ModelNotFitted)?;
        Ok((data, model))
    }

    /// Summary of the current model.
    pub fn summary(&self) -> Result<SegmentSummary> {
        let (data, fitted) = self.snapshot()?;
        Self::summarize(&data, &fitted)
    }

    /// Segment assignment of every loaded record under the current model.
    pub fn assignments(&self) -> Result<Vec<usize>> {
        let (_, fitted) = self.snapshot()?;
        Ok(fitted.model.assignments().to_vec())
    }

    /// Two-feature projection of the current model for plotting.
    pub fn scatter(&self, view: ScatterView) -> Result<ScatterData> {
        let (data, fitted) = self.snapshot()?;
        ScatterData::build(view, &fitted.model, &data.raw, &data.params, &data.features)
    }

    /// Elbow curve over the configured k range.
    pub fn elbow(&self) -> Result<Vec<ElbowPoint>> {
        self.elbow_range(self.config.elbow_range.to_range())
    }

    /// Elbow curve over `ks`, truncated to the row count.
    ///
    /// Uses throwaway models; the current model is untouched.
    pub fn elbow_range(&self, ks: RangeInclusive<usize>) -> Result<Vec<ElbowPoint>> {
        let data = self.data()?;
        let n = data.scaled.nrows();
        let (start, end) = (*ks.start(), *ks.end());
        if start > n {
            return Err(Error::InvalidClusterCount {
                requested: start,
                n_items: n,
            });
        }
        if end > n {
            debug!(requested = end, rows = n, "elbow range truncated to row count");
        }
        elbow_scan(&data.scaled, start..=end.min(n), |k| self.config.kmeans(k))
    }

    /// Make sure a model exists, fitting one with the current k if allowed.
    pub fn ensure_fitted(&self) -> Result<FitOrigin> {
        self.ensure_snapshot().map(|(_, _, origin)| origin)
    }

    fn ensure_snapshot(&self) -> Result<(Arc<LoadedData>, Arc<FittedModel>, FitOrigin)> {
        {
            let state = self.state.read();
            let data = state.data.clone().ok_or(Error::DataNotLoaded)?;
            if let Some(model) = state.model.clone() {
                return Ok((data, model, FitOrigin::Existing));
            }
        }
        if !self.config.lazy_fit {
            return Err(Error::ModelNotFitted);
        }

        let mut state = self.state.write();
        let data = state.data.clone().ok_or(Error::DataNotLoaded)?;
        // Another caller may have fitted between the two locks.
        if let Some(model) = state.model.clone() {
            return Ok((data, model, FitOrigin::Existing));
        }
        let k = state.current_k;
        info!(k, origin = "on_demand", "no model fitted, fitting before classification");
        let fitted = Arc::new(self.fit_data(&data, k)?);
        state.model = Some(fitted.clone());
        Ok((data, fitted, FitOrigin::OnDemand))
    }

    /// Classify a record given as named fields.
    ///
    /// Fields are resolved against the same data snapshot that scales and
    /// classifies them, so a concurrent load cannot mix column sets.
    pub fn classify(&self, input: &ClassifyInput) -> Result<Classification> {
        let (data, fitted, origin) = self.ensure_snapshot()?;
        let raw = resolve_vector(&data.features, input, &self.config.input_defaults);
        self.classify_in(&data, &fitted, origin, &raw)
    }

    /// Classify a raw vector in feature order.
    pub fn classify_vector(&self, raw: &[f64]) -> Result<Classification> {
        let expected = self.data()?.features.len();
        if raw.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: raw.len(),
            });
        }
        let (data, fitted, origin) = self.ensure_snapshot()?;
        self.classify_in(&data, &fitted, origin, raw)
    }

    fn classify_in(
        &self,
        data: &LoadedData,
        fitted: &FittedModel,
        origin: FitOrigin,
        raw: &[f64],
    ) -> Result<Classification> {
        let (segment, label, means) = classify_raw(
            raw,
            &fitted.model,
            &data.params,
            &fitted.means,
            &data.features,
            &self.config.labeler,
        )?;
        Ok(Classification {
            segment,
            label,
            means,
            origin,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    fn incomes() -> Dataset {
        Dataset::new(
            vec!["id".into(), "income".into()],
            [10.0, 12.0, 90.0, 95.0, 91.0]
                .iter()
                .enumerate()
                .map(|(i, &x)| vec![Value::Number(i as f64), Value::Number(x)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn operations_before_load_report_missing_data() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.fit(2).unwrap_err(), Error::DataNotLoaded);
        assert_eq!(engine.elbow().unwrap_err(), Error::DataNotLoaded);
        assert_eq!(
            engine.classify(&ClassifyInput::new()).unwrap_err(),
            Error::DataNotLoaded
        );
    }

    #[test]
    fn failed_fit_keeps_previous_model_and_k() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_dataset(incomes()).unwrap();
        let first = engine.fit(2).unwrap();
        assert!(matches!(
            engine.fit(9),
            Err(Error::InvalidClusterCount { requested: 9, n_items: 5 })
        ));
        assert_eq!(engine.current_k(), 2);
        assert_eq!(engine.summary().unwrap(), first);
    }

    #[test]
    fn elbow_truncates_to_row_count() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_dataset(incomes()).unwrap();
        let curve = engine.elbow().unwrap();
        assert_eq!(curve.len(), 5);
        assert!(curve[4].dispersion.abs() < 1e-12);
        assert!(!engine.is_fitted());
        assert!(matches!(
            engine.elbow_range(6..=8),
            Err(Error::InvalidClusterCount { requested: 6, .. })
        ));
    }

    #[test]
    fn lazy_fit_disabled_reports_model_not_fitted() {
        let engine = Engine::new(EngineConfig::default().with_lazy_fit(false)).unwrap();
        engine.load_dataset(incomes()).unwrap();
        assert_eq!(engine.ensure_fitted().unwrap_err(), Error::ModelNotFitted);
        assert_eq!(
            engine.classify_vector(&[0.0, 50.0]).unwrap_err(),
            Error::ModelNotFitted
        );
    }

    #[test]
    fn classify_resolves_fields_against_the_classifying_snapshot() {
        let engine = Engine::new(EngineConfig::default().with_default_k(2)).unwrap();
        engine.load_dataset(incomes()).unwrap();
        engine.fit(2).unwrap();
        let (data, fitted, origin) = engine.ensure_snapshot().unwrap();

        // Swap in data with the same width but different columns.
        let other = Dataset::new(
            vec!["tenure".into(), "charges".into()],
            (0..4)
                .map(|i| vec![Value::Number(i as f64), Value::Number(100.0 * i as f64)])
                .collect(),
        )
        .unwrap();
        engine.load_dataset(other).unwrap();

        let input = ClassifyInput::new().with("id", 3.0).with("income", 92.0);
        let raw = resolve_vector(&data.features, &input, &engine.config.input_defaults);
        let hit = engine.classify_in(&data, &fitted, origin, &raw).unwrap();
        assert_eq!(hit.means.keys().collect::<Vec<_>>(), ["id", "income"]);
        assert!(hit.means["income"] > 85.0);

        // A fresh call sees the new columns throughout.
        let hit = engine
            .classify(&ClassifyInput::new().with("tenure", 3.0).with("charges", 300.0)).unwrap();
        assert_eq!(hit.origin, FitOrigin::OnDemand);
        assert!(hit.means.contains_key("charges"));
        assert!(hit.means["charges"] > 150.0);
    }

    #[test]
    fn on_demand_fit_uses_current_k() {
        let engine = Engine::new(EngineConfig::default().with_default_k(2)).unwrap();
        engine.load_dataset(incomes()).unwrap();
        assert_eq!(engine.ensure_fitted().unwrap(), FitOrigin::OnDemand);
        assert_eq!(engine.ensure_fitted().unwrap(), FitOrigin::Existing);
        assert_eq!(engine.summary().unwrap().k, 2);
    }
}
