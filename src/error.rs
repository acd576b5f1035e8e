use core::fmt;

use serde::Serialize;

/// Result alias for `cohort`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the segmentation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Neither the canonical feature list nor the fallback rules produced a
    /// numeric column to cluster on.
    NoUsableFeatures {
        /// Columns that were available in the dataset.
        columns: Vec<String>,
    },

    /// A selected feature has zero variance and the configured policy rejects it.
    DegenerateFeature {
        /// Name of the constant column.
        feature: String,
    },

    /// Vector length disagrees with the feature set.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Invalid number of clusters requested.
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Classification requested with no fitted model and lazy fitting disabled.
    ModelNotFitted,

    /// An operation needed a dataset but none has been loaded.
    DataNotLoaded,
}

/// Discriminant of [`Error`], for callers that map failures onto their own codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::EmptyInput`].
    EmptyInput,
    /// See [`Error::NoUsableFeatures`].
    NoUsableFeatures,
    /// See [`Error::DegenerateFeature`].
    DegenerateFeature,
    /// See [`Error::DimensionMismatch`].
    DimensionMismatch,
    /// See [`Error::ShapeMismatch`].
    ShapeMismatch,
    /// See [`Error::InvalidClusterCount`].
    InvalidClusterCount,
    /// See [`Error::InvalidParameter`].
    InvalidParameter,
    /// See [`Error::ModelNotFitted`].
    ModelNotFitted,
    /// See [`Error::DataNotLoaded`].
    DataNotLoaded,
}

impl Error {
    /// The kind of failure, without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput => ErrorKind::EmptyInput,
            Error::NoUsableFeatures { .. } => ErrorKind::NoUsableFeatures,
            Error::DegenerateFeature { .. } => ErrorKind::DegenerateFeature,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Error::InvalidClusterCount { .. } => ErrorKind::InvalidClusterCount,
            Error::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Error::ModelNotFitted => ErrorKind::ModelNotFitted,
            Error::DataNotLoaded => ErrorKind::DataNotLoaded,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::NoUsableFeatures { columns } => {
                write!(f, "no usable numeric features among columns {columns:?}")
            }
            Error::DegenerateFeature { feature } => {
                write!(f, "feature '{feature}' has zero variance")
            }
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::InvalidClusterCount { requested, n_items } => {
                write!(f, "cannot create {requested} clusters from {n_items} items")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::ModelNotFitted => write!(f, "no segmentation model has been fitted"),
            Error::DataNotLoaded => write!(f, "no dataset has been loaded"),
        }
    }
}

impl std::error::Error for Error {}
