//! HTTP handlers and router assembly
//!
//! Routes:
//! - `GET/POST /api/screenshot` - single PNG capture
//! - `POST /api/screenshot/stream` - SSE progress stream
//! - `POST /api/screenshot/batch` - form-based batch capture
//! - `GET /health`, `/status`, `/ready` - service monitoring

pub mod batch;
pub mod screenshot;
pub mod status;
pub mod stream;

use crate::service::ScreenshotService;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub use status::{ServerMetrics, StatusResponse};

/// Status returned while the capture endpoints are disabled
pub const MAINTENANCE_STATUS: u16 = 512;

/// Fixed body returned while the capture endpoints are disabled
pub const MAINTENANCE_MESSAGE: &str =
    "We are working on a better solution for you, please try again later";

/// Runtime settings shared by all handlers
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// When set, every capture endpoint short-circuits to a fixed 512
    /// response before validation or browser launch
    pub maintenance: bool,
    /// Directory batch captures are saved into
    pub screenshots_dir: PathBuf,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            maintenance: false,
            screenshots_dir: PathBuf::from("static/screenshots"),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// The capture capability shared by every endpoint
    pub service: ScreenshotService,
    /// Request counters and latency tracking
    pub metrics: ServerMetrics,
    /// Runtime settings
    pub settings: RuntimeSettings,
}

impl AppState {
    /// Create application state around a capture service
    pub fn new(service: ScreenshotService, settings: RuntimeSettings) -> Self {
        Self {
            service,
            metrics: ServerMetrics::new(),
            settings,
        }
    }
}

/// Error response carrying an HTTP status and a human-readable message.
///
/// Serialized as `{"message": "..."}`, matching every error path of the API.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    /// 400 with a message
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 500 with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// The fixed disabled-service response returned in maintenance mode
pub fn maintenance_response() -> Response {
    let status =
        StatusCode::from_u16(MAINTENANCE_STATUS).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "message": MAINTENANCE_MESSAGE }))).into_response()
}

/// Build the application router with all endpoints and the CORS layer
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/screenshot",
            get(screenshot::capture_get).post(screenshot::capture_post),
        )
        .route("/api/screenshot/stream", post(stream::capture_stream))
        .route("/api/screenshot/batch", post(batch::capture_batch))
        .merge(status::status_router(state.clone()))
        .layer(crate::cors::cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_client_error() {
        let err = crate::error::Error::Navigation(crate::error::NavigationError::InvalidUrl(
            "nope".to_string(),
        ));
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_api_error_from_capture_failure() {
        let err = crate::error::Error::Capture(crate::error::CaptureError::ScreenshotFailed(
            "encoder died".to_string(),
        ));
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message.contains("encoder died"));
    }

    #[test]
    fn test_timeout_maps_to_internal_with_timeout_message() {
        let err = crate::error::Error::Navigation(crate::error::NavigationError::Timeout(30000));
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message.contains("timed out"));
    }

    #[test]
    fn test_maintenance_response_status() {
        let response = maintenance_response();
        assert_eq!(response.status().as_u16(), MAINTENANCE_STATUS);
    }

    #[test]
    fn test_runtime_settings_default() {
        let settings = RuntimeSettings::default();
        assert!(!settings.maintenance);
        assert_eq!(settings.screenshots_dir, PathBuf::from("static/screenshots"));
    }
}
