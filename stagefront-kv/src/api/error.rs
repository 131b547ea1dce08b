//! HTTP error responses for the store proxy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use stagefront_common::api::{ErrorResponse, SyncAuthError, UNAUTHORIZED_MESSAGE};
use tracing::{error, warn};

use crate::kv::KvError;

/// Errors surfaced to store proxy clients
#[derive(Debug)]
pub enum ApiError {
    /// Key header missing or wrong
    Unauthorized,
    /// No KV binding attached to this deployment
    MissingBinding,
    /// PUT attempted while no sync secret is configured
    SecretNotConfigured,
    /// Body could not be stored as text
    BadRequest(String),
    /// Binding failed while reading or writing
    Storage(String),
}

impl From<SyncAuthError> for ApiError {
    fn from(err: SyncAuthError) -> Self {
        match err {
            SyncAuthError::NotConfigured => ApiError::SecretNotConfigured,
            SyncAuthError::MissingKey | SyncAuthError::InvalidKey => ApiError::Unauthorized,
        }
    }
}

impl From<KvError> for ApiError {
    fn from(err: KvError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE.to_string()),
            ApiError::MissingBinding => {
                error!("Request rejected: no KV binding configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error: KV binding not configured".to_string(),
                )
            }
            ApiError::SecretNotConfigured => {
                warn!("PUT rejected: sync secret not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error: Sync secret not configured".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Bad Request: {}", msg)),
            ApiError::Storage(msg) => {
                error!("KV binding failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Server Error: {}", msg))
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
