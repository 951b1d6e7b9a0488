// src/models/mod.rs
pub mod forest;
pub mod linear;
pub mod svr;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;

pub use forest::{RandomForestModel, RegressionTree, TreeNode};
pub use linear::{LinearModel, RansacModel};
pub use svr::{Kernel, SvrModel};

/// Artifact format this build understands.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A fitted regressor evaluated one feature row at a time.
pub trait Regressor {
    /// Checks internal dimensions against the width of the feature rows it will see.
    fn validate(&self, n_features: usize) -> Result<()>;

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    Linear(LinearModel),
    Ransac(RansacModel),
    RandomForest(RandomForestModel),
    Svr(SvrModel),
}

impl RegressionModel {
    pub fn kind(&self) -> &'static str {
        match self {
            RegressionModel::Linear(_) => "linear",
            RegressionModel::Ransac(_) => "ransac",
            RegressionModel::RandomForest(_) => "random_forest",
            RegressionModel::Svr(_) => "svr",
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            RegressionModel::Linear(m) => m,
            RegressionModel::Ransac(m) => m,
            RegressionModel::RandomForest(m) => m,
            RegressionModel::Svr(m) => m,
        }
    }

    /// Whether this model family can back the given selector.
    pub fn serves(&self, algorithm: Algorithm) -> bool {
        matches!(
            (algorithm, self),
            (Algorithm::Lr, RegressionModel::Linear(_))
                | (Algorithm::Sgd, RegressionModel::Linear(_))
                | (Algorithm::Ransac, RegressionModel::Ransac(_))
                | (Algorithm::Rfr, RegressionModel::RandomForest(_))
                | (Algorithm::Svr, RegressionModel::Svr(_))
        )
    }
}

/// A persisted regression model together with the contract it was fitted under.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub algorithm: Algorithm,
    pub n_features: usize,
    pub model: RegressionModel,
}

impl ModelArtifact {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).context("Failed to decode model artifact")?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            bail!(
                "unsupported model format version {} (expected {})",
                self.format_version,
                MODEL_FORMAT_VERSION
            );
        }
        if self.n_features == 0 {
            bail!("model declares zero input features");
        }
        if !self.model.serves(self.algorithm) {
            bail!(
                "a '{}' model cannot serve algorithm '{}'",
                self.model.kind(),
                self.algorithm
            );
        }
        self.model
            .as_regressor()
            .validate(self.n_features)
            .with_context(|| format!("'{}' model is inconsistent", self.algorithm))
    }

    /// Predicts one value per feature row.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.n_features {
            bail!(
                "model '{}' expects {} features, got {}",
                self.algorithm,
                self.n_features,
                features.ncols()
            );
        }
        let regressor = self.model.as_regressor();
        features
            .outer_iter()
            .map(|row| regressor.predict_row(row))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }
}
