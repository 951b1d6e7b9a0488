// src/prediction/mod.rs
//! The request contract shared by every transport binding: normalised input
//! in, `{ "area": f64 }` out.
pub mod cache;

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::observation::{Observation, ObservationForm};
use crate::registry::{ModelRegistry, ModelSet};

pub use cache::{create_shared_cache, CacheKey, CacheStats, PredictionCache, SharedPredictionCache};

/// JSON body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub algo: String,
    #[serde(rename = "observations")]
    pub observation: Observation,
}

impl From<ObservationForm> for PredictRequest {
    fn from(form: ObservationForm) -> Self {
        let (algo, observation) = form.into_parts();
        Self { algo, observation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    InvalidRequest(String),
    UnknownAlgorithm(String),
    InvalidObservation(String),
    ModelUnavailable(Algorithm),
    Transform(String),
    Inference(String),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            PredictError::UnknownAlgorithm(msg) => write!(f, "{}", msg),
            PredictError::InvalidObservation(msg) => write!(f, "Invalid observation: {}", msg),
            PredictError::ModelUnavailable(algo) => {
                write!(f, "Model '{}' is not loaded", algo)
            }
            PredictError::Transform(msg) => write!(f, "Feature preparation failed: {}", msg),
            PredictError::Inference(msg) => write!(f, "Prediction failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictError {}

/// Resolves the selector, prepares features with the current pipeline and
/// asks the selected model for a prediction.
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    cache: SharedPredictionCache,
    legacy_algo_fallback: bool,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>, cache_size: usize, legacy_algo_fallback: bool) -> Self {
        Self {
            registry,
            cache: create_shared_cache(cache_size),
            legacy_algo_fallback,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult, PredictError> {
        let algorithm = Algorithm::resolve(&request.algo, self.legacy_algo_fallback)
            .map_err(PredictError::UnknownAlgorithm)?;
        request
            .observation
            .validate()
            .map_err(PredictError::InvalidObservation)?;

        let snapshot = self.registry.current().await;
        let features = snapshot
            .pipeline
            .pipeline
            .prepare(&request.observation)
            .map_err(|e| PredictError::Transform(format!("{:#}", e)))?;

        let key = CacheKey::new(snapshot.generation, algorithm, &features);
        if let Some(area) = self.cache.lock().await.get(&key) {
            debug!("Cached {} prediction (generation {}): {}", algorithm, snapshot.generation, area);
            return Ok(PredictionResult { area });
        }

        let area = Self::run_model(&snapshot, algorithm, &features)?;
        debug!("{} prediction (generation {}): {}", algorithm, snapshot.generation, area);
        self.cache.lock().await.put(key, area);
        Ok(PredictionResult { area })
    }

    fn run_model(
        snapshot: &ModelSet,
        algorithm: Algorithm,
        features: &ndarray::Array2<f64>,
    ) -> Result<f64, PredictError> {
        let loaded = snapshot
            .model(algorithm)
            .ok_or(PredictError::ModelUnavailable(algorithm))?;
        let predictions = loaded
            .artifact
            .predict(features)
            .map_err(|e| PredictError::Inference(format!("{:#}", e)))?;
        let area = predictions
            .first()
            .copied()
            .ok_or_else(|| PredictError::Inference("model returned no predictions".to_string()))?;
        if !area.is_finite() {
            return Err(PredictError::Inference(format!(
                "model '{}' produced a non-finite area",
                algorithm
            )));
        }
        Ok(area)
    }

    /// Reloads the registry and drops cached predictions of older generations.
    pub async fn reload(&self) -> Result<Arc<ModelSet>> {
        let set = self.registry.reload().await?;
        self.cache.lock().await.clear();
        Ok(set)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegressionModel;
    use crate::observation::sample_observation;
    use crate::registry::ModelStore;
    use crate::test_support::{sample_model, write_model, write_sample_artifacts};

    fn service(dir: &std::path::Path, cache_size: usize, legacy: bool) -> PredictionService {
        let registry = ModelRegistry::load(ModelStore::new(dir)).unwrap();
        PredictionService::new(Arc::new(registry), cache_size, legacy)
    }

    fn request(algo: &str) -> PredictRequest {
        PredictRequest {
            algo: algo.to_string(),
            observation: sample_observation(),
        }
    }

    #[tokio::test]
    async fn test_every_algorithm_predicts_a_finite_area() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, false);
        for algo in Algorithm::ALL {
            let result = service.predict(&request(algo.as_str())).await.unwrap();
            assert!(result.area.is_finite(), "{} gave {}", algo, result.area);
        }
    }

    #[tokio::test]
    async fn test_rfr_matches_hand_computed_value() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, false);
        // scaled X is 1.5 > 0 -> 9.0; sunday column is 0 <= 0.5 -> 2.0
        let result = service.predict(&request("rfr")).await.unwrap();
        assert_eq!(result.area, 5.5);
    }

    #[tokio::test]
    async fn test_unknown_algorithm_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, false);
        let err = service.predict(&request("knn")).await.unwrap_err();
        assert!(matches!(err, PredictError::UnknownAlgorithm(_)));
    }

    #[tokio::test]
    async fn test_legacy_fallback_uses_svr() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, true);
        let fallback = service.predict(&request("knn")).await.unwrap();
        let svr = service.predict(&request("svr")).await.unwrap();
        assert_eq!(fallback, svr);
    }

    #[tokio::test]
    async fn test_invalid_observation() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, false);
        let mut req = request("lr");
        req.observation.y = 12;
        let err = service.predict(&req).await.unwrap_err();
        assert!(matches!(err, PredictError::InvalidObservation(_)));
    }

    #[tokio::test]
    async fn test_missing_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        std::fs::remove_file(dir.path().join("sgd_model.json")).unwrap();
        let service = service(dir.path(), 0, false);
        let err = service.predict(&request("sgd")).await.unwrap_err();
        assert_eq!(err, PredictError::ModelUnavailable(Algorithm::Sgd));
        assert!(service.predict(&request("lr")).await.is_ok());
    }

    #[tokio::test]
    async fn test_form_and_json_requests_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 0, false);

        let json = r#"{"algo":"lr","observations":{"X":7,"Y":5,"month":"mar","day":"fri",
            "FFMC":86.2,"DMC":26.2,"DC":94.3,"ISI":5.1,"temp":8.2,"RH":51,"wind":6.7,"rain":0.0}}"#;
        let from_json: PredictRequest = serde_json::from_str(json).unwrap();
        let form = ObservationForm {
            algo: "lr".to_string(),
            x: 7,
            y: 5,
            month: crate::observation::Month::Mar,
            day: crate::observation::Weekday::Fri,
            ffmc: 86.2,
            dmc: 26.2,
            dc: 94.3,
            isi: 5.1,
            temp: 8.2,
            rh: 51.0,
            wind: 6.7,
            rain: 0.0,
        };
        let from_form = PredictRequest::from(form);
        assert_eq!(from_json, from_form);
        assert_eq!(
            service.predict(&from_json).await.unwrap(),
            service.predict(&from_form).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_cache_serves_repeats_and_clears_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_artifacts(dir.path());
        let service = service(dir.path(), 16, false);

        let first = service.predict(&request("lr")).await.unwrap();
        let second = service.predict(&request("lr")).await.unwrap();
        assert_eq!(first, second);
        let stats = service.cache_stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 1));

        let mut artifact = sample_model(Algorithm::Lr, 29);
        if let RegressionModel::Linear(ref mut m) = artifact.model {
            m.intercept += 100.0;
        }
        write_model(dir.path(), &artifact);
        service.reload().await.unwrap();
        assert_eq!(service.cache_stats().await.len, 0);

        let after = service.predict(&request("lr")).await.unwrap();
        assert!((after.area - first.area - 100.0).abs() < 1e-9);
    }
}
