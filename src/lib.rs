//! # cohort
//!
//! Behavioral segmentation of tabular records: choose clustering features,
//! standardize them, partition records with k-means++ / Lloyd, scan
//! dispersion across k to justify a segment count, name segments with an
//! ordered rule table, and classify new records into the nearest segment.
//!
//! ```rust
//! use cohort::{ClassifyInput, Dataset, Engine, EngineConfig, Value};
//!
//! let rows = [(19.0, 15.0, 39.0), (21.0, 15.0, 81.0), (20.0, 16.0, 6.0),
//!             (23.0, 16.0, 77.0), (31.0, 17.0, 40.0), (22.0, 17.0, 76.0)];
//! let dataset = Dataset::new(
//!     vec!["Age".into(), "Annual Income (k$)".into(), "Spending Score (1-100)".into()],
//!     rows.iter()
//!         .map(|&(a, i, s)| vec![Value::Number(a), Value::Number(i), Value::Number(s)])
//!         .collect(),
//! )?;
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! engine.load_dataset(dataset)?;
//! let curve = engine.elbow()?;
//! assert_eq!(curve.len(), 6);
//!
//! let summary = engine.fit(2)?;
//! assert_eq!(summary.labels.len(), 2);
//!
//! let hit = engine.classify(&ClassifyInput::new().with("age", 22.0).with("spending", 80.0))?;
//! assert!(hit.segment < 2);
//! # Ok::<(), cohort::Error>(())
//! ```

pub mod classify;
pub mod cluster;
pub mod config;
pub mod dataset;
pub mod engine;
/// Error types used across `cohort`.
pub mod error;
pub mod features;
pub mod label;
pub mod normalize;
pub mod summary;

pub use classify::{resolve_vector, Classification, ClassifyInput, FitOrigin};
pub use cluster::{elbow_scan, ClusterModel, Clustering, ElbowPoint, Kmeans};
pub use config::{EngineConfig, InputDefault, KRange};
pub use dataset::{Dataset, Value};
pub use engine::Engine;
pub use error::{Error, ErrorKind, Result};
pub use features::{select_features, FeatureSet};
pub use label::{LabelRule, LabelRules, SegmentLabel, SegmentLabeler};
pub use normalize::{NormalizationParams, ZeroVariancePolicy};
pub use summary::{palette, ScatterData, ScatterView, SegmentSummary};
