//! REST single-image capture endpoint
//!
//! `GET /api/screenshot?url=<URL>&fullpage=<bool>` and
//! `POST /api/screenshot` with `{"url": "...", "fullpage": false}` both
//! return raw PNG bytes on success.

use super::{maintenance_response, ApiError, AppState};
use crate::browser::{CaptureOptions, CaptureResult};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{instrument, warn};

/// Query parameters for `GET /api/screenshot`
#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    /// Target URL
    pub url: Option<String>,
    /// Capture the full page instead of the viewport
    #[serde(default)]
    pub fullpage: Option<bool>,
}

/// JSON body for `POST /api/screenshot`
#[derive(Debug, Deserialize)]
pub struct ScreenshotBody {
    /// Target URL
    pub url: Option<String>,
    /// Capture the full page instead of the viewport
    #[serde(default)]
    pub fullpage: Option<bool>,
}

/// `GET /api/screenshot`
#[instrument(skip_all)]
pub async fn capture_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScreenshotQuery>,
) -> Response {
    if state.settings.maintenance {
        return maintenance_response();
    }

    let Some(url) = query.url.filter(|u| !u.trim().is_empty()) else {
        return ApiError::bad_request("URL parameter is required").into_response();
    };

    run_capture(&state, &url, query.fullpage.unwrap_or(false)).await
}

/// `POST /api/screenshot`
#[instrument(skip_all)]
pub async fn capture_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScreenshotBody>,
) -> Response {
    if state.settings.maintenance {
        return maintenance_response();
    }

    let Some(url) = body.url.filter(|u| !u.trim().is_empty()) else {
        return ApiError::bad_request("URL is required in request body").into_response();
    };

    run_capture(&state, &url, body.fullpage.unwrap_or(false)).await
}

/// Shared capture path for both methods
async fn run_capture(state: &AppState, url: &str, full_page: bool) -> Response {
    let started = Instant::now();
    let options = CaptureOptions { full_page };

    let result = state.service.capture(url, &options).await;
    state.metrics.record_latency(started.elapsed());

    match result {
        Ok(capture) => {
            state.metrics.record_capture();
            png_response(&capture)
        }
        Err(e) => {
            warn!("Screenshot capture failed for {}: {}", url, e);
            state.metrics.record_error();
            ApiError::from(e).into_response()
        }
    }
}

/// Raw PNG response with inline content disposition and no-cache headers
fn png_response(capture: &CaptureResult) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let disposition = format!(
        "inline; filename=\"screenshot-{}.png\"",
        chrono::Utc::now().timestamp_millis()
    );
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => {
            return ApiError::internal(format!("Invalid response header: {e}")).into_response();
        }
    }

    (headers, capture.data.clone()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserialization() {
        let query: ScreenshotQuery =
            serde_json::from_str(r#"{"url":"https://example.com","fullpage":true}"#).unwrap();
        assert_eq!(query.url.as_deref(), Some("https://example.com"));
        assert_eq!(query.fullpage, Some(true));
    }

    #[test]
    fn test_query_defaults() {
        let query: ScreenshotQuery = serde_json::from_str("{}").unwrap();
        assert!(query.url.is_none());
        assert!(query.fullpage.is_none());
    }

    #[test]
    fn test_png_response_headers() {
        let capture = CaptureResult {
            data: vec![1, 2, 3],
            size: 3,
        };
        let response = png_response(&capture);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("inline; filename=\"screenshot-"));
        assert!(disposition.ends_with(".png\""));
    }
}
