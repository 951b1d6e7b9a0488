// src/pipeline/artifact.rs
use anyhow::{bail, Context, Result};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::transformers::{AttributeSelector, CustomBinarizer, Passthrough, StandardScaler, Transformer};
use crate::observation::{ColumnKind, Observation};

/// Artifact format this build understands.
pub const PIPELINE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BranchTransform {
    StandardScaler(StandardScaler),
    Binarizer(CustomBinarizer),
    Passthrough,
}

impl BranchTransform {
    fn as_transformer(&self) -> &dyn Transformer {
        match self {
            BranchTransform::StandardScaler(s) => s,
            BranchTransform::Binarizer(b) => b,
            BranchTransform::Passthrough => &Passthrough,
        }
    }
}

/// One arm of the feature union: a column selection followed by a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineBranch {
    pub name: String,
    pub attributes: AttributeSelector,
    pub transform: BranchTransform,
}

impl PipelineBranch {
    fn validate(&self) -> Result<()> {
        let kind = self.attributes.validate()?;
        match &self.transform {
            BranchTransform::StandardScaler(scaler) => {
                if kind != Some(ColumnKind::Numeric) {
                    bail!("standard_scaler needs numeric columns only");
                }
                scaler.validate(self.attributes.len())
            }
            BranchTransform::Passthrough => {
                if kind != Some(ColumnKind::Numeric) {
                    bail!("passthrough needs numeric columns only");
                }
                Ok(())
            }
            BranchTransform::Binarizer(binarizer) => {
                if kind != Some(ColumnKind::Categorical) {
                    bail!("binarizer needs categorical columns only");
                }
                binarizer.validate()
            }
        }
    }

    pub fn output_width(&self) -> usize {
        self.transform
            .as_transformer()
            .output_width(self.attributes.len())
    }

    /// Output column labels: selected names for numeric branches,
    /// `branch=label` for binarized ones.
    pub fn feature_names(&self) -> Vec<String> {
        match &self.transform {
            BranchTransform::Binarizer(binarizer) => binarizer
                .class_labels
                .iter()
                .map(|label| format!("{}={}", self.name, label))
                .collect(),
            _ => self.attributes.attribute_names.clone(),
        }
    }

    fn apply(&self, observations: &[Observation]) -> Result<Array2<f64>> {
        let rows = self.attributes.select(observations)?;
        self.transform.as_transformer().transform(&rows)
    }
}

/// Persisted feature transformation: named observation columns in, a fixed
/// number of numeric features out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub format_version: u32,
    pub branches: Vec<PipelineBranch>,
}

impl FeaturePipeline {
    /// Decodes and validates a pipeline artifact.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let pipeline: FeaturePipeline =
            serde_json::from_slice(bytes).context("Failed to decode pipeline artifact")?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            bail!(
                "unsupported pipeline format version {} (expected {})",
                self.format_version,
                PIPELINE_FORMAT_VERSION
            );
        }
        if self.branches.is_empty() {
            bail!("pipeline has no branches");
        }
        for branch in &self.branches {
            branch
                .validate()
                .with_context(|| format!("pipeline branch '{}' is invalid", branch.name))?;
        }
        Ok(())
    }

    /// Number of features every transformed row carries.
    pub fn output_width(&self) -> usize {
        self.branches.iter().map(PipelineBranch::output_width).sum()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.branches
            .iter()
            .flat_map(PipelineBranch::feature_names)
            .collect()
    }

    /// Transforms any number of observations into a `(rows, output_width)` matrix.
    pub fn transform(&self, observations: &[Observation]) -> Result<Array2<f64>> {
        let parts = self
            .branches
            .iter()
            .map(|branch| {
                branch
                    .apply(observations)
                    .with_context(|| format!("branch '{}' failed", branch.name))
            })
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<ArrayView2<f64>> = parts.iter().map(|p| p.view()).collect();
        let features = concatenate(Axis(1), &views).context("Failed to join branch outputs")?;
        debug_assert_eq!(features.ncols(), self.output_width());
        Ok(features)
    }

    /// Single-row convenience used by the request path.
    pub fn prepare(&self, observation: &Observation) -> Result<Array2<f64>> {
        self.transform(std::slice::from_ref(observation))
    }
}
