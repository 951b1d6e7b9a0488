// src/models/forest.rs
use anyhow::{bail, Context, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::Regressor;

/// A node of a fitted regression tree. Children always sit after their parent
/// in the node list, so descent from node 0 terminates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl TreeNode {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    pub fn leaf(value: f64) -> Self {
        TreeNode::Leaf { value }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("tree has no nodes");
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        bail!("node {} splits on feature {} of {}", idx, feature, n_features);
                    }
                    if !threshold.is_finite() {
                        bail!("node {} has a non-finite threshold", idx);
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            bail!("node {} points to invalid child {}", idx, child);
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        bail!("leaf {} has a non-finite value", idx);
                    }
                }
            }
        }
        Ok(())
    }

    /// Descends from the root, going left when `x[feature] <= threshold`.
    pub fn evaluate(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut idx = 0;
        // a valid path visits each node at most once
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row
                        .get(*feature)
                        .with_context(|| format!("row has no feature {}", feature))?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                None => bail!("tree node {} does not exist", idx),
            }
        }
        bail!("tree descent did not reach a leaf")
    }
}

/// Bagged ensemble of regression trees; predicts the mean of the tree outputs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RandomForestModel {
    pub trees: Vec<RegressionTree>,
}

impl Regressor for RandomForestModel {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.trees.is_empty() {
            bail!("random forest has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .with_context(|| format!("tree {} is invalid", i))?;
        }
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if self.trees.is_empty() {
            bail!("random forest has no trees");
        }
        let total = self
            .trees
            .iter()
            .map(|tree| tree.evaluate(row))
            .sum::<Result<f64>>()?;
        Ok(total / self.trees.len() as f64)
    }
}
