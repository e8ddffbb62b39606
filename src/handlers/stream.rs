//! Streaming capture endpoint
//!
//! `POST /api/screenshot/stream` returns a server-sent-event stream that
//! reports status transitions while a capture runs:
//! `starting` -> `navigating` -> `capturing` -> `completed` | `error`.
//! Every terminal event closes the stream; there is no transition back.

use super::{maintenance_response, ApiError, AppState};
use crate::browser::CaptureOptions;
use crate::service::CaptureStage;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// JSON body for `POST /api/screenshot/stream`
#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    /// Target URL
    pub url: Option<String>,
}

/// Status tag of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Stream opened, browser being acquired
    Starting,
    /// Page created, navigation in progress
    Navigating,
    /// Navigation complete, screenshot in progress
    Capturing,
    /// Capture finished, image payload attached
    Completed,
    /// Capture failed, message attached
    Error,
}

/// A self-contained JSON event pushed over the SSE connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Status tag
    pub status: StreamStatus,
    /// Human-readable progress message
    pub message: String,
    /// Base64 data URI of the PNG, present on completion
    #[serde(rename = "imageData", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    /// Target URL, present on terminal events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StreamEvent {
    /// The opening event
    pub fn starting() -> Self {
        Self {
            status: StreamStatus::Starting,
            message: "Launching browser...".to_string(),
            image_data: None,
            url: None,
        }
    }

    /// Emitted once the page begins loading
    pub fn navigating() -> Self {
        Self {
            status: StreamStatus::Navigating,
            message: "Navigating to URL...".to_string(),
            image_data: None,
            url: None,
        }
    }

    /// Emitted once navigation completes
    pub fn capturing() -> Self {
        Self {
            status: StreamStatus::Capturing,
            message: "Taking screenshot...".to_string(),
            image_data: None,
            url: None,
        }
    }

    /// Terminal success event carrying the image payload
    pub fn completed(image_data: String, url: String) -> Self {
        Self {
            status: StreamStatus::Completed,
            message: "Screenshot captured successfully".to_string(),
            image_data: Some(image_data),
            url: Some(url),
        }
    }

    /// Terminal failure event
    pub fn error(message: String, url: String) -> Self {
        Self {
            status: StreamStatus::Error,
            message,
            image_data: None,
            url: Some(url),
        }
    }

    /// Whether this event closes the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, StreamStatus::Completed | StreamStatus::Error)
    }
}

/// Decrements the active-SSE gauge when the stream is dropped, whether the
/// capture finished or the client disconnected early.
struct SseConnectionGuard {
    state: Arc<AppState>,
}

impl SseConnectionGuard {
    fn new(state: Arc<AppState>) -> Self {
        state.metrics.increment_sse_connections();
        Self { state }
    }
}

impl Drop for SseConnectionGuard {
    fn drop(&mut self) {
        self.state.metrics.decrement_sse_connections();
    }
}

/// `POST /api/screenshot/stream`
#[instrument(skip_all)]
pub async fn capture_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StreamRequest>,
) -> Response {
    if state.settings.maintenance {
        return maintenance_response();
    }

    let Some(url) = body.url.filter(|u| !u.trim().is_empty()) else {
        return ApiError::bad_request("URL is required in request body").into_response();
    };

    let guard = SseConnectionGuard::new(state.clone());
    let (tx, rx) = mpsc::channel::<StreamEvent>(16);

    let task_state = state.clone();
    let task_url = url.clone();
    tokio::spawn(async move {
        run_streamed_capture(task_state, task_url, tx).await;
    });

    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        match rx.recv().await {
            Some(event) => match Event::default().json_data(&event) {
                Ok(sse_event) => Some((Ok::<_, Infallible>(sse_event), (rx, guard))),
                Err(_) => None,
            },
            None => None,
        }
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new())
        .into_response()
}

/// Drive one capture, pushing status events in order and exactly one
/// terminal event. Dropping the sender afterwards closes the stream.
async fn run_streamed_capture(
    state: Arc<AppState>,
    url: String,
    events: mpsc::Sender<StreamEvent>,
) {
    let started = std::time::Instant::now();
    let _ = events.send(StreamEvent::starting()).await;

    let (stage_tx, mut stage_rx) = mpsc::channel::<CaptureStage>(4);
    let forward_tx = events.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(stage) = stage_rx.recv().await {
            let event = match stage {
                CaptureStage::Navigating => StreamEvent::navigating(),
                CaptureStage::Capturing => StreamEvent::capturing(),
            };
            if forward_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let result = state
        .service
        .capture_with_progress(&url, &CaptureOptions::viewport(), Some(&stage_tx))
        .await;

    // Drain the stage channel so ordering holds before the terminal event
    drop(stage_tx);
    let _ = forwarder.await;

    state.metrics.record_latency(started.elapsed());

    let terminal = match result {
        Ok(capture) => {
            state.metrics.record_capture();
            debug!("Streamed capture of {} complete ({} bytes)", url, capture.size);
            StreamEvent::completed(capture.to_data_uri(), url)
        }
        Err(e) => {
            state.metrics.record_error();
            StreamEvent::error(e.to_string(), url)
        }
    };
    let _ = events.send(terminal).await;
}
