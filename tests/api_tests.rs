//! HTTP API tests
//!
//! These tests drive the full router with `tower::ServiceExt::oneshot`.
//! They cover maintenance mode, input validation, and the monitoring
//! endpoints - all paths that short-circuit before a browser launch, so no
//! Chrome/Chromium instance is required.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pageshot::browser::BrowserConfig;
use pageshot::handlers::{AppState, RuntimeSettings, MAINTENANCE_MESSAGE, MAINTENANCE_STATUS};
use pageshot::service::ScreenshotService;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tower::ServiceExt;

fn test_app(maintenance: bool) -> (Router, Arc<AppState>) {
    let service = ScreenshotService::new(BrowserConfig::default());
    let settings = RuntimeSettings {
        maintenance,
        screenshots_dir: std::env::temp_dir().join("pageshot-tests"),
    };
    let state = Arc::new(AppState::new(service, settings));
    (pageshot::app_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body was not JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

// ============================================================================
// Maintenance mode
// ============================================================================

#[tokio::test]
async fn maintenance_short_circuits_rest_get() {
    let (app, state) = test_app(true);

    let response = app
        .oneshot(get("/api/screenshot?url=https://example.com"))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
    let json = body_json(response).await;
    assert_eq!(json["message"], MAINTENANCE_MESSAGE);
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn maintenance_short_circuits_rest_post() {
    let (app, state) = test_app(true);

    let response = app
        .oneshot(post_json(
            "/api/screenshot",
            r#"{"url":"https://example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
    let json = body_json(response).await;
    assert_eq!(json["message"], MAINTENANCE_MESSAGE);
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn maintenance_short_circuits_stream() {
    let (app, state) = test_app(true);

    let response = app
        .oneshot(post_json(
            "/api/screenshot/stream",
            r#"{"url":"https://example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
    let json = body_json(response).await;
    assert_eq!(json["message"], MAINTENANCE_MESSAGE);
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn maintenance_short_circuits_batch() {
    let (app, state) = test_app(true);

    let response = app
        .oneshot(post_form(
            "/api/screenshot/batch",
            "urls=https%3A%2F%2Fexample.com",
        ))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
    let json = body_json(response).await;
    assert_eq!(json["message"], MAINTENANCE_MESSAGE);
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn maintenance_supersedes_validation() {
    // Even invalid input gets the fixed 512, not a 400
    let (app, _state) = test_app(true);

    let response = app.oneshot(get("/api/screenshot")).await.unwrap();

    assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn rest_get_without_url_is_bad_request() {
    let (app, state) = test_app(false);

    let response = app.oneshot(get("/api/screenshot")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "URL parameter is required");
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn rest_get_with_blank_url_is_bad_request() {
    let (app, _state) = test_app(false);

    let response = app.oneshot(get("/api/screenshot?url=")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rest_post_without_url_is_bad_request() {
    let (app, state) = test_app(false);

    let response = app.oneshot(post_json("/api/screenshot", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "URL is required in request body");
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn rest_get_with_invalid_url_is_bad_request() {
    // Scheme validation happens before any browser launch
    let (app, state) = test_app(false);

    let response = app.oneshot(get("/api/screenshot?url=not-a-url")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn stream_without_url_is_bad_request() {
    let (app, state) = test_app(false);

    let response = app
        .oneshot(post_json("/api/screenshot/stream", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "URL is required in request body");
    assert!(!state.service.browser_running());
}

#[tokio::test]
async fn batch_without_urls_is_bad_request() {
    let (app, state) = test_app(false);

    let response = app
        .oneshot(post_form("/api/screenshot/batch", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No URLs provided");
    assert!(!state.service.browser_running());
}

// ============================================================================
// Batch semantics
// ============================================================================

#[tokio::test]
async fn batch_filters_blank_urls_and_isolates_failures() {
    // Invalid URLs fail during validation before a browser is needed, so
    // the per-URL isolation contract is observable without Chrome: the
    // blank entry is dropped and the bad one gets its own error record.
    let (app, state) = test_app(false);

    let response = app
        .oneshot(post_form("/api/screenshot/batch", "urls=bad-url&urls="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let screenshots = json["screenshots"].as_array().unwrap();
    assert_eq!(screenshots.len(), 1);
    assert_eq!(screenshots[0]["url"], "bad-url");
    assert_eq!(screenshots[0]["success"], false);
    assert!(screenshots[0]["error"].as_str().is_some());
    assert!(!state.service.browser_running());
}

// ============================================================================
// Streaming semantics
// ============================================================================

#[tokio::test]
async fn stream_emits_starting_then_terminal_error() {
    // An invalid URL fails validation inside the capture task, so the
    // stream carries `starting` followed by exactly one `error` event and
    // then closes - no browser required.
    let (app, state) = test_app(false);

    let response = app
        .oneshot(post_json("/api/screenshot/stream", r#"{"url":"bad-url"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    let starting = body.find(r#""status":"starting""#).expect("no starting event");
    let error = body.find(r#""status":"error""#).expect("no error event");
    assert!(starting < error, "starting must precede the terminal event");
    assert!(!body.contains(r#""status":"completed""#));
    assert!(body.contains("bad-url"));

    // Connection closed; the gauge must drain back to zero
    assert_eq!(state.metrics.active_sse_connections(), 0);
    assert!(!state.service.browser_running());
}

// ============================================================================
// Monitoring endpoints
// ============================================================================

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _state) = test_app(false);

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn status_endpoint_reports_runtime_state() {
    let (app, state) = test_app(true);
    state.metrics.record_capture();

    let response = app.oneshot(get("/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "pageshot");
    assert_eq!(json["maintenance"], true);
    assert_eq!(json["browser_running"], false);
    assert_eq!(json["captures_processed"], 1);
    assert!(json["memory"]["rss_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn ready_endpoint_responds() {
    let (app, _state) = test_app(false);

    let response = app.oneshot(get("/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
