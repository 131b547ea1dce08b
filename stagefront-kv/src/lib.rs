//! stagefront-kv library - Persistent Store proxy
//!
//! Stateless pass-through to a single KV record holding the serialized site
//! data. GET is public; PUT requires the `x-auth-key` header to match the
//! server-held secret. No merge, validation or versioning happens here.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::Router;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod kv;

use kv::KvBinding;

/// Route serving the site record
pub const RECORD_ROUTE: &str = "/api/data";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage binding; `None` models a deployment with no binding attached
    pub kv: Option<Arc<dyn KvBinding>>,
    /// Key of the record served on [`RECORD_ROUTE`]
    pub record_key: String,
    /// Shared secret for PUT; `None` disables writes
    pub sync_secret: Option<String>,
    /// Upper bound for PUT bodies
    pub max_body_bytes: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(
        kv: Option<Arc<dyn KvBinding>>,
        record_key: impl Into<String>,
        sync_secret: Option<String>,
    ) -> Self {
        Self {
            kv,
            record_key: record_key.into(),
            sync_secret: sync_secret.filter(|s| !s.is_empty()),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Build application router
///
/// Every response carries `Access-Control-Allow-Origin: *`.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::any;

    let body_limit = state.max_body_bytes;

    Router::new()
        .route(RECORD_ROUTE, any(api::record_handler))
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}
