// src/registry/mod.rs
pub mod store;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::algorithm::Algorithm;

pub use store::{LoadedModel, LoadedPipeline, ModelStore, PIPELINE_FILE_NAME};

/// An immutable snapshot of the pipeline and every model that loaded cleanly.
#[derive(Debug)]
pub struct ModelSet {
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub pipeline: LoadedPipeline,
    models: BTreeMap<Algorithm, LoadedModel>,
    failures: BTreeMap<Algorithm, String>,
}

impl ModelSet {
    /// Loads the pipeline and all five models. Models that are missing,
    /// undecodable or fitted for a different feature width are skipped;
    /// the pipeline and at least one model are required.
    pub fn load(store: &ModelStore, generation: u64) -> Result<Self> {
        let pipeline = store
            .load_pipeline()
            .context("Failed to load feature pipeline")?;
        let width = pipeline.pipeline.output_width();

        let mut models = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for algorithm in Algorithm::ALL {
            let outcome = store.load_model(algorithm).and_then(|loaded| {
                if loaded.artifact.n_features != width {
                    bail!(
                        "model expects {} features but the pipeline produces {}",
                        loaded.artifact.n_features,
                        width
                    );
                }
                Ok(loaded)
            });
            match outcome {
                Ok(loaded) => {
                    models.insert(algorithm, loaded);
                }
                Err(e) => {
                    error!("Skipping '{}' model: {:#}", algorithm, e);
                    failures.insert(algorithm, format!("{:#}", e));
                }
            }
        }

        if models.is_empty() {
            bail!(
                "no usable models found in {}",
                store.root().display()
            );
        }
        if !failures.is_empty() {
            warn!(
                "Generation {} serves {} of {} algorithms",
                generation,
                models.len(),
                Algorithm::ALL.len()
            );
        }

        Ok(Self {
            generation,
            loaded_at: Utc::now(),
            pipeline,
            models,
            failures,
        })
    }

    pub fn model(&self, algorithm: Algorithm) -> Option<&LoadedModel> {
        self.models.get(&algorithm)
    }

    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.models.keys().copied().collect()
    }

    pub fn report(&self) -> RegistryReport {
        let models = Algorithm::ALL
            .iter()
            .map(|algo| match self.models.get(algo) {
                Some(loaded) => ModelReport {
                    algorithm: *algo,
                    loaded: true,
                    kind: Some(loaded.artifact.model.kind()),
                    n_features: Some(loaded.artifact.n_features),
                    sha256: Some(loaded.sha256.clone()),
                    error: None,
                },
                None => ModelReport {
                    algorithm: *algo,
                    loaded: false,
                    kind: None,
                    n_features: None,
                    sha256: None,
                    error: self.failures.get(algo).cloned(),
                },
            })
            .collect();

        RegistryReport {
            generation: self.generation,
            loaded_at: self.loaded_at,
            pipeline: PipelineReport {
                sha256: self.pipeline.sha256.clone(),
                output_width: self.pipeline.pipeline.output_width(),
                branches: self
                    .pipeline
                    .pipeline
                    .branches
                    .iter()
                    .map(|b| b.name.clone())
                    .collect(),
            },
            models,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub sha256: String,
    pub output_width: usize,
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub algorithm: Algorithm,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub pipeline: PipelineReport,
    pub models: Vec<ModelReport>,
}

/// Process-wide holder of the current [`ModelSet`]. Readers clone the `Arc`
/// and keep using their snapshot even while a reload swaps in a new one.
pub struct ModelRegistry {
    store: ModelStore,
    current: RwLock<Arc<ModelSet>>,
    reload_lock: Mutex<()>,
}

impl ModelRegistry {
    pub fn load(store: ModelStore) -> Result<Self> {
        info!("Loading model artifacts from {}", store.root().display());
        let set = ModelSet::load(&store, 1)?;
        info!(
            "Model registry ready: generation {}, algorithms {:?}",
            set.generation,
            set.algorithms()
        );
        Ok(Self {
            store,
            current: RwLock::new(Arc::new(set)),
            reload_lock: Mutex::new(()),
        })
    }

    pub async fn current(&self) -> Arc<ModelSet> {
        self.current.read().await.clone()
    }

    /// Builds a complete new snapshot from disk and swaps it in. On failure
    /// the previous snapshot stays active.
    pub async fn reload(&self) -> Result<Arc<ModelSet>> {
        let _guard = self.reload_lock.lock().await;
        let next_generation = self.current().await.generation + 1;
        let store = self.store.clone();

        let set = tokio::task::spawn_blocking(move || ModelSet::load(&store, next_generation))
            .await
            .context("Reload task panicked")?
            .with_context(|| format!("Reload to generation {} failed", next_generation))?;

        let set = Arc::new(set);
        *self.current.write().await = set.clone();
        info!(
            "Model registry reloaded: generation {}, algorithms {:?}",
            set.generation,
            set.algorithms()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegressionModel;
    use crate::test_support::{sample_model, write_model, write_sample_artifacts};

    #[test]
    fn test_load_full_set() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let set = ModelSet::load(&ModelStore::new(dir.path()), 1).unwrap();
        assert_eq!(set.algorithms(), Algorithm::ALL.to_vec());
        let report = set.report();
        assert_eq!(report.pipeline.output_width, 29);
        assert!(report.models.iter().all(|m| m.loaded));
    }

    #[test]
    fn test_missing_model_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        std::fs::remove_file(dir.path().join("rfr_model.json")).unwrap();

        let set = ModelSet::load(&ModelStore::new(dir.path()), 1).unwrap();
        assert!(set.model(Algorithm::Rfr).is_none());
        assert!(set.model(Algorithm::Lr).is_some());
        let report = set.report();
        let rfr = report
            .models
            .iter()
            .find(|m| m.algorithm == Algorithm::Rfr)
            .unwrap();
        assert!(!rfr.loaded);
        assert!(rfr.error.as_deref().unwrap().contains("rfr_model.json"));
    }

    #[test]
    fn test_width_mismatch_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        write_model(dir.path(), &sample_model(Algorithm::Svr, 12));

        let set = ModelSet::load(&ModelStore::new(dir.path()), 1).unwrap();
        assert!(set.model(Algorithm::Svr).is_none());
        let report = set.report();
        let svr = report.models.iter().find(|m| m.algorithm == Algorithm::Svr).unwrap();
        assert!(svr.error.as_deref().unwrap().contains("12 features"));
    }

    #[test]
    fn test_requires_pipeline_and_one_model() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelSet::load(&ModelStore::new(dir.path()), 1).is_err());

        crate::test_support::write_pipeline(dir.path(), &crate::test_support::sample_pipeline());
        let err = ModelSet::load(&ModelStore::new(dir.path()), 1).unwrap_err();
        assert!(err.to_string().contains("no usable models"));
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let registry = ModelRegistry::load(ModelStore::new(dir.path())).unwrap();
        let first = registry.current().await;
        assert_eq!(first.generation, 1);

        let mut artifact = sample_model(Algorithm::Lr, 29);
        if let RegressionModel::Linear(ref mut m) = artifact.model {
            m.intercept = 99.0;
        }
        write_model(dir.path(), &artifact);

        let second = registry.reload().await.unwrap();
        assert_eq!(second.generation, 2);
        assert_eq!(registry.current().await.generation, 2);
        assert_ne!(
            first.model(Algorithm::Lr).unwrap().sha256,
            second.model(Algorithm::Lr).unwrap().sha256
        );
        // the old snapshot is still usable by whoever holds it
        assert_eq!(first.generation, 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let registry = ModelRegistry::load(ModelStore::new(dir.path())).unwrap();

        std::fs::write(dir.path().join(PIPELINE_FILE_NAME), b"{not json").unwrap();
        assert!(registry.reload().await.is_err());

        let current = registry.current().await;
        assert_eq!(current.generation, 1);
        assert_eq!(current.algorithms().len(), 5);
    }
}
