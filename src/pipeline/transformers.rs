// src/pipeline/transformers.rs
use anyhow::{bail, Context, Result};
use log::warn;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::observation::{column_kind, ColumnKind, ColumnValue, Observation};

/// A fitted, stateless transformation from selected columns to numeric features.
pub trait Transformer {
    /// Number of output columns for `input_columns` selected columns.
    fn output_width(&self, input_columns: usize) -> usize;

    /// Transforms one row per observation into a `(rows, output_width)` matrix.
    fn transform(&self, rows: &[Vec<ColumnValue>]) -> Result<Array2<f64>>;
}

/// Picks named columns out of each observation, in the listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSelector {
    pub attribute_names: Vec<String>,
}

impl AttributeSelector {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            attribute_names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.attribute_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_names.is_empty()
    }

    /// Fails on empty selections and names no observation column carries.
    /// Returns the common kind of the selected columns, or `None` if mixed.
    pub fn validate(&self) -> Result<Option<ColumnKind>> {
        if self.attribute_names.is_empty() {
            bail!("attribute selector has no columns");
        }
        let mut kinds = HashSet::new();
        for name in &self.attribute_names {
            let kind = column_kind(name)
                .with_context(|| format!("unknown observation column '{}'", name))?;
            kinds.insert(kind);
        }
        Ok(if kinds.len() == 1 {
            kinds.into_iter().next()
        } else {
            None
        })
    }

    pub fn select(&self, observations: &[Observation]) -> Result<Vec<Vec<ColumnValue>>> {
        observations
            .iter()
            .map(|obs| {
                self.attribute_names
                    .iter()
                    .map(|name| {
                        obs.column(name)
                            .with_context(|| format!("observation has no column '{}'", name))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

/// Centers and scales numeric columns with statistics fitted offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self, input_columns: usize) -> Result<()> {
        if self.mean.len() != input_columns || self.scale.len() != input_columns {
            bail!(
                "scaler statistics cover {} means and {} scales but {} columns are selected",
                self.mean.len(),
                self.scale.len(),
                input_columns
            );
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            bail!("scaler statistics contain non-finite values");
        }
        Ok(())
    }

    // Constant columns were fitted with a zero scale; they pass through centered.
    fn effective_scale(&self, idx: usize) -> f64 {
        let s = self.scale[idx];
        if s == 0.0 {
            1.0
        } else {
            s
        }
    }
}

impl Transformer for StandardScaler {
    fn output_width(&self, input_columns: usize) -> usize {
        input_columns
    }

    fn transform(&self, rows: &[Vec<ColumnValue>]) -> Result<Array2<f64>> {
        let width = self.mean.len();
        let mut out = Array2::<f64>::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!("scaler expected {} columns, row {} has {}", width, i, row.len());
            }
            for (j, value) in row.iter().enumerate() {
                let v = value
                    .as_number()
                    .with_context(|| format!("scaler column {} of row {} is not numeric", j, i))?;
                out[[i, j]] = (v - self.mean[j]) / self.effective_scale(j);
            }
        }
        Ok(out)
    }
}

/// Multi-label binarizer over a fixed class vocabulary. Each selected token
/// switches on the column of its class; tokens outside the vocabulary are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomBinarizer {
    pub class_labels: Vec<String>,
}

impl CustomBinarizer {
    pub fn validate(&self) -> Result<()> {
        if self.class_labels.is_empty() {
            bail!("binarizer has no class labels");
        }
        let unique: HashSet<&str> = self.class_labels.iter().map(String::as_str).collect();
        if unique.len() != self.class_labels.len() {
            bail!("binarizer class labels are not unique");
        }
        Ok(())
    }
}

impl Transformer for CustomBinarizer {
    fn output_width(&self, _input_columns: usize) -> usize {
        self.class_labels.len()
    }

    fn transform(&self, rows: &[Vec<ColumnValue>]) -> Result<Array2<f64>> {
        let mut out = Array2::<f64>::zeros((rows.len(), self.class_labels.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let token = value
                    .as_token()
                    .with_context(|| format!("binarizer column {} of row {} is not a token", j, i))?;
                match self.class_labels.iter().position(|c| c == token) {
                    Some(k) => out[[i, k]] = 1.0,
                    None => warn!(
                        "unknown class(es) ['{}'] will be ignored by the binarizer",
                        token
                    ),
                }
            }
        }
        Ok(out)
    }
}

/// Copies numeric columns unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Passthrough;

impl Transformer for Passthrough {
    fn output_width(&self, input_columns: usize) -> usize {
        input_columns
    }

    fn transform(&self, rows: &[Vec<ColumnValue>]) -> Result<Array2<f64>> {
        let width = rows.first().map_or(0, Vec::len);
        let mut out = Array2::<f64>::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!("passthrough rows have uneven widths");
            }
            for (j, value) in row.iter().enumerate() {
                out[[i, j]] = value
                    .as_number()
                    .with_context(|| format!("passthrough column {} of row {} is not numeric", j, i))?;
            }
        }
        Ok(out)
    }
}
