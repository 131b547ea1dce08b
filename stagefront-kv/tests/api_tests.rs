//! Integration tests for the stagefront-kv record endpoint
//!
//! Tests cover:
//! - OPTIONS preflight
//! - GET on an empty and a written record
//! - PUT auth: valid key, wrong key, missing key, unconfigured secret
//! - Missing KV binding
//! - Unsupported verbs
//! - Health endpoint (no auth required)

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use stagefront_kv::kv::{FileKv, KvBinding, MemoryKv};
use stagefront_kv::{build_router, AppState};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

const SECRET: &str = "correct-horse";

/// Test helper: app backed by an in-memory binding
fn setup_app() -> (Router, Arc<MemoryKv>) {
    let kv = Arc::new(MemoryKv::new());
    let state = AppState::new(
        Some(kv.clone() as Arc<dyn KvBinding>),
        "site_data",
        Some(SECRET.to_string()),
    );
    (build_router(state), kv)
}

fn request(method: &str, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/api/data");
    if let Some(key) = key {
        builder = builder.header("x-auth-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn assert_cors(response: &axum::response::Response) {
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

// =============================================================================
// GET
// =============================================================================

#[tokio::test]
async fn test_get_before_any_write_returns_null() {
    let (app, _) = setup_app();

    let response = app.oneshot(request("GET", None, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_text(response).await, "null");
}

#[tokio::test]
async fn test_get_returns_stored_blob_verbatim() {
    let (app, kv) = setup_app();
    let blob = "{ \"hero\" : {\"title\":\"X\"} }";
    kv.put("site_data", blob.to_string()).await.unwrap();

    let response = app.oneshot(request("GET", None, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, blob);
}

// =============================================================================
// PUT
// =============================================================================

#[tokio::test]
async fn test_put_with_valid_key_stores_body() {
    let (app, kv) = setup_app();
    let blob = "{\"tracks\":[]}";

    let response = app
        .oneshot(request("PUT", Some(SECRET), blob))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"success": true}));
    assert_eq!(kv.get("site_data").await.unwrap().as_deref(), Some(blob));
}

#[tokio::test]
async fn test_put_with_wrong_key_is_forbidden() {
    let (app, kv) = setup_app();

    let response = app
        .oneshot(request("PUT", Some("wrong"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_cors(&response);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"error": "Unauthorized: Invalid or missing Key"}));
    assert_eq!(kv.get("site_data").await.unwrap(), None, "nothing written");
}

#[tokio::test]
async fn test_put_without_key_is_forbidden() {
    let (app, _) = setup_app();

    let response = app.oneshot(request("PUT", None, "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_put_without_configured_secret_fails_closed() {
    let kv = Arc::new(MemoryKv::new());
    let app = build_router(AppState::new(Some(kv.clone() as Arc<dyn KvBinding>), "site_data", None));

    let response = app
        .oneshot(request("PUT", Some(""), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Server Error"));
    assert_eq!(kv.get("site_data").await.unwrap(), None);
}

#[tokio::test]
async fn test_put_then_get_with_file_binding() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = AppState::new(
        Some(Arc::new(FileKv::new(dir.path())) as Arc<dyn KvBinding>),
        "site_data",
        Some(SECRET.to_string()),
    );
    let app = build_router(state);

    let put = app
        .clone()
        .oneshot(request("PUT", Some(SECRET), "{\"hero\":{}}"))
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);

    let get = app.oneshot(request("GET", None, "")).await.unwrap();
    assert_eq!(body_text(get).await, "{\"hero\":{}}");
}

#[tokio::test]
async fn test_put_over_body_limit_is_rejected() {
    let kv = Arc::new(MemoryKv::new());
    let state = AppState::new(Some(kv as Arc<dyn KvBinding>), "site_data", Some(SECRET.to_string()))
        .with_max_body_bytes(16);
    let app = build_router(state);

    let response = app
        .oneshot(request("PUT", Some(SECRET), &"x".repeat(64)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// Misconfiguration, preflight and verbs
// =============================================================================

#[tokio::test]
async fn test_missing_binding_is_server_error() {
    let app = build_router(AppState::new(None, "site_data", Some(SECRET.to_string())));

    let response = app.oneshot(request("GET", None, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Server Error"));
}

#[tokio::test]
async fn test_options_preflight() {
    let (app, _) = setup_app();

    let response = app.oneshot(request("OPTIONS", None, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PUT"));
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_other_verbs_are_not_allowed() {
    let (app, _) = setup_app();

    for method in ["POST", "DELETE", "PATCH"] {
        let response = app
            .clone()
            .oneshot(request(method, Some(SECRET), "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_cors(&response);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_text(response).await, "Method not allowed");
    }
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _) = setup_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "stagefront-kv");
    assert_eq!(body["writable"], true);
}
