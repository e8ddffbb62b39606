//! Form-based batch capture endpoint
//!
//! `POST /api/screenshot/batch` accepts an urlencoded form with a repeatable
//! `urls` field, captures every non-blank URL concurrently, saves the PNGs
//! into the static screenshots directory, and reports a per-URL result list.

use super::{maintenance_response, AppState};
use crate::browser::CaptureOptions;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// `POST /api/screenshot/batch`
#[instrument(skip_all)]
pub async fn capture_batch(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    if state.settings.maintenance {
        return maintenance_response();
    }

    let urls = parse_urls_form(&body);
    if urls.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No URLs provided" })),
        )
            .into_response();
    }

    let started = Instant::now();
    let screenshots = state
        .service
        .capture_batch(
            &urls,
            &CaptureOptions::viewport(),
            &state.settings.screenshots_dir,
        )
        .await;
    state.metrics.record_latency(started.elapsed());

    for entry in &screenshots {
        if entry.success {
            state.metrics.record_capture();
        } else {
            state.metrics.record_error();
        }
    }

    info!(
        "Batch capture finished: {} of {} succeeded",
        screenshots.iter().filter(|s| s.success).count(),
        screenshots.len()
    );

    Json(json!({ "screenshots": screenshots })).into_response()
}

/// Collect every `urls` value from an urlencoded form body
fn parse_urls_form(body: &[u8]) -> Vec<String> {
    url::form_urlencoded::parse(body)
        .filter(|(key, _)| key == "urls")
        .map(|(_, value)| value.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_urls_form_repeated_field() {
        let body = b"urls=https%3A%2F%2Fexample.com&urls=https%3A%2F%2Frust-lang.org";
        let urls = parse_urls_form(body);
        assert_eq!(
            urls,
            vec![
                "https://example.com".to_string(),
                "https://rust-lang.org".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_urls_form_keeps_blank_entries_for_later_filtering() {
        // Blank values survive parsing; the capture service filters them
        let body = b"urls=https%3A%2F%2Fexample.com&urls=";
        let urls = parse_urls_form(body);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "");
    }

    #[test]
    fn test_parse_urls_form_ignores_other_fields() {
        let body = b"action=screenshot&urls=https%3A%2F%2Fexample.com";
        let urls = parse_urls_form(body);
        assert_eq!(urls, vec!["https://example.com".to_string()]);
    }

    #[test]
    fn test_parse_urls_form_empty_body() {
        assert!(parse_urls_form(b"").is_empty());
    }
}
