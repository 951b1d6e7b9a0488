// src/models/svr.rs
use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::Regressor;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn validate(&self) -> Result<()> {
        let (gamma, coef0) = match *self {
            Kernel::Linear => return Ok(()),
            Kernel::Rbf { gamma } => (gamma, 0.0),
            Kernel::Poly { gamma, coef0, .. } => (gamma, coef0),
            Kernel::Sigmoid { gamma, coef0 } => (gamma, coef0),
        };
        if !(gamma.is_finite() && gamma > 0.0) {
            bail!("kernel gamma must be positive, got {}", gamma);
        }
        if !coef0.is_finite() {
            bail!("kernel coef0 is not finite");
        }
        Ok(())
    }

    pub fn apply(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { gamma } => {
                let sq_dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq_dist).exp()
            }
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * a.dot(&b) + coef0).powi(degree as i32),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

/// On-disk shape of an SVR: support vectors as nested rows.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SvrArtifact {
    kernel: Kernel,
    support_vectors: Vec<Vec<f64>>,
    dual_coef: Vec<f64>,
    intercept: f64,
}

/// Epsilon-support vector regressor: `sum_i dual_coef[i] * K(sv_i, x) + intercept`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "SvrArtifact", into = "SvrArtifact")]
pub struct SvrModel {
    pub kernel: Kernel,
    pub support_vectors: Array2<f64>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
}

impl SvrModel {
    pub fn new(
        kernel: Kernel,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, String> {
        Self::try_from(SvrArtifact {
            kernel,
            support_vectors,
            dual_coef,
            intercept,
        })
    }
}

impl TryFrom<SvrArtifact> for SvrModel {
    type Error = String;

    fn try_from(raw: SvrArtifact) -> Result<Self, Self::Error> {
        let rows = raw.support_vectors.len();
        let cols = raw.support_vectors.first().map_or(0, Vec::len);
        if raw.support_vectors.iter().any(|sv| sv.len() != cols) {
            return Err("support vectors have uneven lengths".to_string());
        }
        let flat: Vec<f64> = raw.support_vectors.into_iter().flatten().collect();
        let support_vectors = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| format!("invalid support vector matrix: {}", e))?;
        Ok(Self {
            kernel: raw.kernel,
            support_vectors,
            dual_coef: raw.dual_coef,
            intercept: raw.intercept,
        })
    }
}

impl From<SvrModel> for SvrArtifact {
    fn from(model: SvrModel) -> Self {
        Self {
            kernel: model.kernel,
            support_vectors: model
                .support_vectors
                .outer_iter()
                .map(|sv| sv.to_vec())
                .collect(),
            dual_coef: model.dual_coef,
            intercept: model.intercept,
        }
    }
}

impl Regressor for SvrModel {
    fn validate(&self, n_features: usize) -> Result<()> {
        self.kernel.validate()?;
        let n_support = self.support_vectors.nrows();
        if n_support == 0 {
            bail!("svr has no support vectors");
        }
        if self.support_vectors.ncols() != n_features {
            bail!(
                "support vectors have {} features, expected {}",
                self.support_vectors.ncols(),
                n_features
            );
        }
        if self.dual_coef.len() != n_support {
            bail!(
                "{} dual coefficients for {} support vectors",
                self.dual_coef.len(),
                n_support
            );
        }
        if !self.intercept.is_finite()
            || self.dual_coef.iter().any(|c| !c.is_finite())
            || self.support_vectors.iter().any(|v| !v.is_finite())
        {
            bail!("svr has non-finite parameters");
        }
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if row.len() != self.support_vectors.ncols() {
            bail!(
                "svr expects {} features, got {}",
                self.support_vectors.ncols(),
                row.len()
            );
        }
        let decision: f64 = self
            .support_vectors
            .outer_iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * self.kernel.apply(sv, row))
            .sum();
        Ok(decision + self.intercept)
    }
}
