//! Engine configuration.
//!
//! Every field has a default, so a config document only needs the keys it
//! changes:
//!
//! ```rust
//! use cohort::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "default_k": 4, "lazy_fit": false }"#).unwrap();
//! assert_eq!(config.default_k, 4);
//! assert_eq!(config.n_init, 10);
//! ```

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::cluster::{Kmeans, DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_SEED};
use crate::error::{Error, Result};
use crate::label::SegmentLabeler;
use crate::normalize::ZeroVariancePolicy;

/// Canonical clustering features, in vector order.
pub fn default_canonical_features() -> Vec<String> {
    vec![
        "Age".to_string(),
        "Annual Income (k$)".to_string(),
        "Spending Score (1-100)".to_string(),
    ]
}

/// Inclusive k range for elbow scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KRange {
    /// Smallest k scanned; at least 1.
    pub start: usize,
    /// Largest k scanned, inclusive.
    pub end: usize,
}

impl Default for KRange {
    fn default() -> Self {
        Self { start: 1, end: 10 }
    }
}

impl KRange {
    /// As a `RangeInclusive`.
    pub fn to_range(self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Fills one classification input slot by feature-name substring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDefault {
    /// Case-insensitive substring of the feature name.
    pub pattern: String,
    /// Input field consulted when the feature name itself is absent.
    pub field: String,
    /// Value used when the field is absent too.
    pub value: f64,
}

impl InputDefault {
    pub fn new(pattern: &str, field: &str, value: f64) -> Self {
        Self {
            pattern: pattern.to_string(),
            field: field.to_string(),
            value,
        }
    }
}

pub fn default_input_defaults() -> Vec<InputDefault> {
    vec![
        InputDefault::new("age", "age", 34.0),
        InputDefault::new("income", "income", 65.0),
        InputDefault::new("spending", "spending", 88.0),
    ]
}

/// Tunables for [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// k used by an on-demand fit before any explicit fit.
    pub default_k: usize,
    /// Master seed for k-means restarts.
    pub seed: u64,
    /// Independent k-means restarts per fit.
    pub n_init: usize,
    /// Lloyd iteration cap per restart.
    pub max_iter: usize,
    /// k range scanned by [`crate::Engine::elbow`].
    pub elbow_range: KRange,
    /// Constant-column handling.
    pub zero_variance: ZeroVariancePolicy,
    /// Fit on demand when classifying without a model.
    pub lazy_fit: bool,
    /// Preferred clustering features.
    pub canonical_features: Vec<String>,
    /// Fill rules for classification inputs.
    pub input_defaults: Vec<InputDefault>,
    /// Labeler for fitted summaries.
    pub labeler: SegmentLabeler,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            seed: DEFAULT_SEED,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            elbow_range: KRange::default(),
            zero_variance: ZeroVariancePolicy::default(),
            lazy_fit: true,
            canonical_features: default_canonical_features(),
            input_defaults: default_input_defaults(),
            labeler: SegmentLabeler::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::InvalidParameter {
            name: "config",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the k used before any explicit fit.
    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Set the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of restarts per fit.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the Lloyd iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the elbow scan range, inclusive on both ends.
    pub fn with_elbow_range(mut self, start: usize, end: usize) -> Self {
        self.elbow_range = KRange { start, end };
        self
    }

    /// Set constant-column handling.
    pub fn with_zero_variance(mut self, policy: ZeroVariancePolicy) -> Self {
        self.zero_variance = policy;
        self
    }

    /// Enable or disable fitting on demand at classification time.
    pub fn with_lazy_fit(mut self, lazy: bool) -> Self {
        self.lazy_fit = lazy;
        self
    }

    /// Set the labeler.
    pub fn with_labeler(mut self, labeler: SegmentLabeler) -> Self {
        self.labeler = labeler;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, message: &str| -> Result<()> {
            Err(Error::InvalidParameter {
                name,
                message: message.to_string(),
            })
        };
        if self.default_k == 0 {
            return invalid("default_k", "must be at least 1");
        }
        if self.n_init == 0 {
            return invalid("n_init", "must be at least 1");
        }
        if self.max_iter == 0 {
            return invalid("max_iter", "must be at least 1");
        }
        if self.elbow_range.start == 0 || self.elbow_range.start > self.elbow_range.end {
            return invalid("elbow_range", "must be ascending and start at 1 or above");
        }
        Ok(())
    }

    /// Clusterer for `k` with this config's seed, restarts and iteration cap.
    pub fn kmeans(&self, k: usize) -> Kmeans {
        Kmeans::new(k)
            .with_seed(self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "seed": 7, "zero_variance": "reject", "elbow_range": { "start": 1, "end": 6 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.zero_variance, ZeroVariancePolicy::Reject);
        assert_eq!(config.elbow_range.to_range(), 1..=6);
        assert_eq!(config.default_k, 5);
        assert_eq!(config.canonical_features, default_canonical_features());
    }

    #[test]
    fn custom_rules_parse_from_json() {
        let config = EngineConfig::from_json(
            r#"{ "labeler": { "rules": { "rules": [
                { "when": { "op": "above", "metric": "engagement", "cutoff": 70.0 }, "label": "Hot" },
                { "when": { "op": "always" }, "label": "Cold" }
            ] } } }"#,
        )
        .unwrap();
        assert_eq!(config.labeler.rules.evaluate(10.0, 80.0), Some("Hot"));
        assert_eq!(config.labeler.rules.evaluate(10.0, 20.0), Some("Cold"));
        assert_eq!(config.labeler.value_keys, vec!["income".to_string()]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "n_init": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "n_init", .. }));

        let err = EngineConfig::default()
            .with_elbow_range(4, 2)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "elbow_range", .. }));

        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "config", .. }));
    }
}
