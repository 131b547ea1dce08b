//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Whether a KV binding is attached
    pub binding: bool,
    /// Whether PUT is enabled (sync secret configured)
    pub writable: bool,
}

/// GET /health
///
/// Does NOT require authentication.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "stagefront-kv".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        binding: state.kv.is_some(),
        writable: state.kv.is_some() && state.sync_secret.is_some(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
