//! Tabular datasets handed to the engine by an ingestion layer.
//!
//! A [`Dataset`] is an ordered list of records over a fixed, ordered list of
//! columns. Cells are either numeric or textual; only columns whose every
//! cell is numeric can take part in clustering.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FeatureSet;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric cell.
    Number(f64),
    /// Textual cell (identifiers, categories).
    Text(String),
}

impl Value {
    /// The numeric value, if this cell is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(x as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Ordered records over ordered columns.
///
/// Deserialization goes through [`Dataset::new`], so a decoded dataset holds
/// the same shape guarantees as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked wire form of [`Dataset`].
#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        Dataset::new(raw.columns, raw.rows)
    }
}

impl Dataset {
    /// Build a dataset, checking that it has at least one record and that
    /// every record has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if columns.is_empty() || rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::ShapeMismatch {
                    expected: format!("{} cells per record", columns.len()),
                    actual: format!("record {i} has {} cells", row.len()),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records, in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a constructed dataset; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// True when every cell of the column at `idx` is a finite number.
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        idx < self.columns.len()
            && self.rows.iter().all(|row| {
                row.get(idx)
                    .and_then(Value::as_f64)
                    .is_some_and(f64::is_finite)
            })
    }

    /// Raw feature matrix: rows = records, columns = `features` in order.
    pub fn feature_matrix(&self, features: &FeatureSet) -> Result<Array2<f64>> {
        let indices = features
            .names()
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| Error::ShapeMismatch {
                    expected: format!("column '{name}'"),
                    actual: "column absent from dataset".to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array2::zeros((self.rows.len(), indices.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, &col) in indices.iter().enumerate() {
                out[[i, j]] = row
                    .get(col)
                    .and_then(Value::as_f64)
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| Error::ShapeMismatch {
                        expected: format!("finite number in column '{}'", self.columns[col]),
                        actual: format!("record {i} has a missing, textual or non-finite cell"),
                    })?;
            }
        }
        Ok(out)
    }
}
