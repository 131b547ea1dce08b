//! Site record endpoint
//!
//! | Method  | Auth              | Response                    |
//! |---------|-------------------|-----------------------------|
//! | OPTIONS | none              | empty, CORS headers         |
//! | GET     | none              | stored blob, or `null`      |
//! | PUT     | `x-auth-key`      | `{"success": true}`         |
//! | other   | none              | 405 `Method not allowed`    |

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use stagefront_common::api::{check_sync_key, SuccessResponse, AUTH_HEADER};
use tracing::{debug, info, warn};

use super::error::ApiError;
use crate::AppState;

const JSON_CONTENT_TYPE: &str = "application/json";

/// ANY /api/data
pub async fn record_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok(preflight());
    }

    let kv = state.kv.as_ref().ok_or(ApiError::MissingBinding)?;

    match method {
        Method::GET => {
            let stored = kv.get(&state.record_key).await?;
            debug!(
                "GET {} -> {}",
                state.record_key,
                stored.as_ref().map_or("null".to_string(), |s| format!("{} bytes", s.len()))
            );
            Ok(json_text(stored.unwrap_or_else(|| "null".to_string())))
        }
        Method::PUT => {
            let provided = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
            if let Err(e) = check_sync_key(state.sync_secret.as_deref(), provided) {
                warn!("PUT {} rejected: {}", state.record_key, e);
                return Err(e.into());
            }

            let text = String::from_utf8(body.to_vec())
                .map_err(|_| ApiError::BadRequest("body is not valid UTF-8".to_string()))?;
            let len = text.len();
            kv.put(&state.record_key, text).await?;
            info!("Stored {} ({} bytes)", state.record_key, len);

            Ok(Json(SuccessResponse::ok()).into_response())
        }
        _ => Ok((StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()),
    }
}

/// Stored text passed through verbatim with a JSON content type
fn json_text(text: String) -> Response {
    let mut response = Response::new(Body::from(text));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}

fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, PUT, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, x-auth-key"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
