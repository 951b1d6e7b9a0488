// src/registry/store.rs
use anyhow::{bail, Context, Result};
use log::debug;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::algorithm::Algorithm;
use crate::models::ModelArtifact;
use crate::pipeline::FeaturePipeline;

pub const PIPELINE_FILE_NAME: &str = "pipeline.json";

/// A decoded model plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub artifact: ModelArtifact,
    pub sha256: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoadedPipeline {
    pub pipeline: FeaturePipeline,
    pub sha256: String,
    pub path: PathBuf,
}

/// Maps algorithm selectors to artifact files under one models directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, algorithm: Algorithm) -> PathBuf {
        self.root.join(algorithm.artifact_file_name())
    }

    pub fn pipeline_path(&self) -> PathBuf {
        self.root.join(PIPELINE_FILE_NAME)
    }

    pub fn load_pipeline(&self) -> Result<LoadedPipeline> {
        let path = self.pipeline_path();
        let (bytes, sha256) = read_artifact(&path)?;
        let pipeline = FeaturePipeline::from_json_slice(&bytes)
            .with_context(|| format!("Invalid pipeline artifact {}", path.display()))?;
        debug!(
            "Loaded pipeline from {} ({} features, sha256 {})",
            path.display(),
            pipeline.output_width(),
            &sha256[..12]
        );
        Ok(LoadedPipeline {
            pipeline,
            sha256,
            path,
        })
    }

    pub fn load_model(&self, algorithm: Algorithm) -> Result<LoadedModel> {
        let path = self.model_path(algorithm);
        let (bytes, sha256) = read_artifact(&path)?;
        let artifact = ModelArtifact::from_json_slice(&bytes)
            .with_context(|| format!("Invalid model artifact {}", path.display()))?;
        if artifact.algorithm != algorithm {
            bail!(
                "{} holds a '{}' model, expected '{}'",
                path.display(),
                artifact.algorithm,
                algorithm
            );
        }
        debug!(
            "Loaded {} model from {} ({}, {} features, sha256 {})",
            algorithm,
            path.display(),
            artifact.model.kind(),
            artifact.n_features,
            &sha256[..12]
        );
        Ok(LoadedModel {
            artifact,
            sha256,
            path,
        })
    }
}

fn read_artifact(path: &Path) -> Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    Ok((bytes, sha256))
}
