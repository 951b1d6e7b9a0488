// src/models/linear.rs
use anyhow::{bail, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::Regressor;

/// Ordinary least squares or SGD-fitted linear regressor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Regressor for LinearModel {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.coefficients.len() != n_features {
            bail!(
                "linear model has {} coefficients for {} features",
                self.coefficients.len(),
                n_features
            );
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("linear model has non-finite parameters");
        }
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            bail!(
                "linear model expects {} features, got {}",
                self.coefficients.len(),
                row.len()
            );
        }
        let weights = ArrayView1::from(&self.coefficients[..]);
        Ok(weights.dot(&row) + self.intercept)
    }
}

/// Linear estimator refitted on the RANSAC consensus set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RansacModel {
    pub estimator: LinearModel,
    #[serde(default)]
    pub inlier_count: Option<usize>,
}

impl Regressor for RansacModel {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.inlier_count == Some(0) {
            bail!("ransac model was fitted on an empty consensus set");
        }
        self.estimator.validate(n_features)
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        self.estimator.predict_row(row)
    }
}
