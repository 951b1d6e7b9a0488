// src/test_support.rs
//! Fixture artifacts shared by the unit tests.
use std::path::Path;

use crate::algorithm::Algorithm;
use crate::models::{
    Kernel, LinearModel, ModelArtifact, RandomForestModel, RansacModel, RegressionModel,
    RegressionTree, SvrModel, TreeNode, MODEL_FORMAT_VERSION,
};
use crate::observation::{Month, Weekday};
use crate::pipeline::{
    AttributeSelector, BranchTransform, CustomBinarizer, FeaturePipeline, PipelineBranch,
    StandardScaler, PIPELINE_FORMAT_VERSION,
};

/// Scaled numerics followed by one-hot months and weekdays: 29 features.
pub fn sample_pipeline() -> FeaturePipeline {
    FeaturePipeline {
        format_version: PIPELINE_FORMAT_VERSION,
        branches: vec![
            PipelineBranch {
                name: "numeric".to_string(),
                attributes: AttributeSelector::new([
                    "X", "Y", "FFMC", "DMC", "DC", "ISI", "temp", "RH", "wind", "rain",
                ]),
                transform: BranchTransform::StandardScaler(StandardScaler {
                    mean: vec![4.0, 4.0, 90.0, 110.0, 550.0, 9.0, 19.0, 44.0, 4.0, 0.0],
                    scale: vec![2.0, 1.25, 5.5, 64.0, 248.0, 4.5, 5.8, 16.3, 1.8, 0.3],
                }),
            },
            PipelineBranch {
                name: "month".to_string(),
                attributes: AttributeSelector::new(["month"]),
                transform: BranchTransform::Binarizer(CustomBinarizer {
                    class_labels: Month::ALL.iter().map(|m| m.as_str().to_string()).collect(),
                }),
            },
            PipelineBranch {
                name: "day".to_string(),
                attributes: AttributeSelector::new(["day"]),
                transform: BranchTransform::Binarizer(CustomBinarizer {
                    class_labels: Weekday::ALL.iter().map(|d| d.as_str().to_string()).collect(),
                }),
            },
        ],
    }
}

fn ramp(n: usize, step: f64, period: usize) -> Vec<f64> {
    (0..n).map(|i| step * ((i % period) as f64 + 1.0)).collect()
}

/// A small deterministic model of the right family for `algorithm`.
pub fn sample_model(algorithm: Algorithm, n_features: usize) -> ModelArtifact {
    let last = n_features.saturating_sub(1);
    let model = match algorithm {
        Algorithm::Lr => RegressionModel::Linear(LinearModel {
            coefficients: ramp(n_features, 0.1, 5),
            intercept: 12.8,
        }),
        Algorithm::Sgd => RegressionModel::Linear(LinearModel {
            coefficients: ramp(n_features, -0.05, 3),
            intercept: 10.0,
        }),
        Algorithm::Ransac => RegressionModel::Ransac(RansacModel {
            estimator: LinearModel {
                coefficients: ramp(n_features, 0.02, 4),
                intercept: 2.5,
            },
            inlier_count: Some(350),
        }),
        Algorithm::Rfr => RegressionModel::RandomForest(RandomForestModel {
            trees: vec![
                RegressionTree {
                    nodes: vec![
                        TreeNode::split(0, 0.0, 1, 2),
                        TreeNode::leaf(4.0),
                        TreeNode::leaf(9.0),
                    ],
                },
                RegressionTree {
                    nodes: vec![
                        TreeNode::split(last, 0.5, 1, 2),
                        TreeNode::leaf(2.0),
                        TreeNode::leaf(6.0),
                    ],
                },
            ],
        }),
        Algorithm::Svr => {
            let support_vectors = vec![
                vec![0.0; n_features],
                ramp(n_features, 0.1, 2),
                ramp(n_features, -0.2, 3),
            ];
            RegressionModel::Svr(
                SvrModel::new(
                    Kernel::Rbf {
                        gamma: 1.0 / n_features as f64,
                    },
                    support_vectors,
                    vec![1.5, -0.5, 2.0],
                    1.2,
                )
                .expect("fixture support vectors are rectangular"),
            )
        }
    };
    ModelArtifact {
        format_version: MODEL_FORMAT_VERSION,
        algorithm,
        n_features,
        model,
    }
}

pub fn write_pipeline(dir: &Path, pipeline: &FeaturePipeline) {
    let bytes = serde_json::to_vec_pretty(pipeline).unwrap();
    std::fs::write(dir.join("pipeline.json"), bytes).unwrap();
}

pub fn write_model(dir: &Path, artifact: &ModelArtifact) {
    let bytes = serde_json::to_vec_pretty(artifact).unwrap();
    std::fs::write(dir.join(artifact.algorithm.artifact_file_name()), bytes).unwrap();
}

/// Writes the sample pipeline and all five sample models into `dir`.
pub fn write_sample_artifacts(dir: &Path) {
    let pipeline = sample_pipeline();
    write_pipeline(dir, &pipeline);
    for algo in Algorithm::ALL {
        write_model(dir, &sample_model(algo, pipeline.output_width()));
    }
}
