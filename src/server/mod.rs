// src/server/mod.rs
pub mod error;
pub mod extract;
pub mod handlers;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::prediction::PredictionService;

pub use error::ApiError;
pub use extract::PredictPayload;

/// The form page served at `/` when no template override is configured.
pub const DEFAULT_INDEX_HTML: &str = include_str!("../../templates/index.html");

pub struct AppState {
    pub service: PredictionService,
    pub index_html: String,
}

impl AppState {
    pub fn new(service: PredictionService, index_html: String) -> Self {
        Self {
            service,
            index_html,
        }
    }
}

/// Reads the page template once; falls back to the embedded form.
pub fn load_index_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display())),
        None => Ok(DEFAULT_INDEX_HTML.to_string()),
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        "[{}] {} {} -> {} in {:.2?}",
        request_id,
        method,
        path,
        response.status(),
        start.elapsed()
    );
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::models))
        .route("/reload", post(handlers::reload))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Binds `address` and serves until Ctrl-C.
pub async fn serve(address: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running instead of shutting down.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for the shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
