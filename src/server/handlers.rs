// src/server/handlers.rs
use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::PredictPayload;
use super::AppState;
use crate::prediction::PredictionResult;
use crate::registry::RegistryReport;
use crate::utils::get_memory_usage;

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    PredictPayload(request): PredictPayload,
) -> Result<Json<PredictionResult>, ApiError> {
    let result = state.service.predict(&request).await?;
    Ok(Json(result))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JsonValue> {
    let snapshot = state.service.registry().current().await;
    let cache = state.service.cache_stats().await;
    Json(json!({
        "status": "ok",
        "generation": snapshot.generation,
        "models": snapshot.algorithms(),
        "cache": cache,
        "memory_mb": get_memory_usage().await,
    }))
}

pub async fn models(State(state): State<Arc<AppState>>) -> Json<RegistryReport> {
    Json(state.service.registry().current().await.report())
}

pub async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<RegistryReport>, ApiError> {
    let set = state
        .service
        .reload()
        .await
        .map_err(|e| ApiError::internal(format!("{:#}", e)))?;
    Ok(Json(set.report()))
}
