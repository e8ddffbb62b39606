//! Page capture functionality
//!
//! PNG screenshot capture over CDP, with helpers for the base64 data URIs
//! used by the streaming endpoint.

use crate::browser::PageHandle;
use crate::error::{CaptureError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Options for screenshot capture
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureOptions {
    /// Capture the full page instead of just the viewport
    #[serde(default)]
    pub full_page: bool,
}

impl CaptureOptions {
    /// Viewport-only capture (the default)
    pub fn viewport() -> Self {
        Self { full_page: false }
    }

    /// Full-page capture
    pub fn full_page() -> Self {
        Self { full_page: true }
    }
}

/// Result of a capture operation
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// The PNG bytes
    pub data: Vec<u8>,
    /// Size in bytes
    pub size: usize,
}

impl CaptureResult {
    /// Get data as base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// Get data as a `data:image/png;base64,...` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }

    /// MIME type of the capture
    pub fn mime_type(&self) -> &'static str {
        "image/png"
    }
}

/// Page capture functionality
pub struct PageCapture;

impl PageCapture {
    /// Take a PNG screenshot of the page
    #[instrument(skip(page))]
    pub async fn screenshot(page: &PageHandle, options: &CaptureOptions) -> Result<CaptureResult> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .from_surface(true)
            .capture_beyond_viewport(options.full_page)
            .build();

        let data = page
            .page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        let size = data.len();
        debug!("Screenshot captured: {} bytes", size);

        Ok(CaptureResult { data, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_options_default() {
        let opts = CaptureOptions::default();
        assert!(!opts.full_page);
    }

    #[test]
    fn test_capture_options_factories() {
        assert!(!CaptureOptions::viewport().full_page);
        assert!(CaptureOptions::full_page().full_page);
    }

    #[test]
    fn test_capture_options_deserialization_defaults() {
        let opts: CaptureOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.full_page);

        let opts: CaptureOptions = serde_json::from_str(r#"{"full_page":true}"#).unwrap();
        assert!(opts.full_page);
    }

    #[test]
    fn test_capture_result_base64() {
        let result = CaptureResult {
            data: b"hello".to_vec(),
            size: 5,
        };
        assert_eq!(result.to_base64(), "aGVsbG8=");
        assert_eq!(result.to_data_uri(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(result.mime_type(), "image/png");
    }
}
