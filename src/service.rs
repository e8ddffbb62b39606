//! Screenshot capture service
//!
//! One capability shared by every endpoint: open a page on the shared
//! browser, navigate, screenshot, and close the page on every exit path.

use crate::browser::{
    BrowserConfig, CaptureOptions, CaptureResult, NavigationOptions, PageCapture, PageNavigator,
    SharedBrowser,
};
use crate::error::Result;
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Progress notifications emitted during a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    /// Page created, navigation beginning
    Navigating,
    /// Navigation complete, screenshot beginning
    Capturing,
}

/// Per-URL outcome of a batch capture
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchEntry {
    /// The requested URL
    pub url: String,
    /// Whether the capture succeeded
    pub success: bool,
    /// Saved filename, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Failure description, on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capture service backed by the process-wide shared browser.
///
/// Cheap to clone; all clones share the same lazily launched browser.
#[derive(Clone)]
pub struct ScreenshotService {
    browser: std::sync::Arc<SharedBrowser>,
    nav_options: NavigationOptions,
}

impl ScreenshotService {
    /// Create a service that launches the browser on first capture
    pub fn new(config: BrowserConfig) -> Self {
        let nav_options = NavigationOptions {
            timeout_ms: config.timeout_ms,
            ..Default::default()
        };
        Self {
            browser: std::sync::Arc::new(SharedBrowser::new(config)),
            nav_options,
        }
    }

    /// Whether the shared browser has been launched
    pub fn browser_running(&self) -> bool {
        self.browser.is_running()
    }

    /// Capture a screenshot of the given URL
    pub async fn capture(&self, url: &str, options: &CaptureOptions) -> Result<CaptureResult> {
        self.capture_with_progress(url, options, None).await
    }

    /// Capture a screenshot, reporting stage transitions over `progress`.
    ///
    /// The page is closed whether or not navigation and capture succeed.
    #[instrument(skip(self, options, progress))]
    pub async fn capture_with_progress(
        &self,
        url: &str,
        options: &CaptureOptions,
        progress: Option<&mpsc::Sender<CaptureStage>>,
    ) -> Result<CaptureResult> {
        crate::browser::UrlValidator::validate(url)?;

        let browser = self.browser.acquire().await?;
        let page = browser.new_page().await?;

        if let Some(tx) = progress {
            let _ = tx.send(CaptureStage::Navigating).await;
        }

        let result = async {
            PageNavigator::goto(&page, url, &self.nav_options).await?;
            if let Some(tx) = progress {
                let _ = tx.send(CaptureStage::Capturing).await;
            }
            PageCapture::screenshot(&page, options).await
        }
        .await;

        if let Err(e) = page.close().await {
            warn!("Failed to close page after capture: {}", e);
        }

        result
    }

    /// Capture a screenshot and save it under `dir`, creating the directory
    /// if absent. Returns the generated filename.
    #[instrument(skip(self, options))]
    pub async fn capture_to_file(
        &self,
        url: &str,
        options: &CaptureOptions,
        dir: &Path,
    ) -> Result<String> {
        let capture = self.capture(url, options).await?;

        tokio::fs::create_dir_all(dir).await?;

        let filename = screenshot_filename();
        let filepath: PathBuf = dir.join(&filename);
        tokio::fs::write(&filepath, &capture.data).await?;

        debug!("Saved screenshot to {}", filepath.display());
        Ok(filename)
    }

    /// Capture each non-blank URL concurrently and independently.
    ///
    /// One URL's failure never aborts the others; every surviving URL gets
    /// its own result entry.
    #[instrument(skip(self, urls, options))]
    pub async fn capture_batch(
        &self,
        urls: &[String],
        options: &CaptureOptions,
        dir: &Path,
    ) -> Vec<BatchEntry> {
        let tasks = urls
            .iter()
            .filter(|url| !url.trim().is_empty())
            .map(|url| async move {
                match self.capture_to_file(url, options, dir).await {
                    Ok(filename) => BatchEntry {
                        url: url.clone(),
                        success: true,
                        filename: Some(filename),
                        error: None,
                    },
                    Err(e) => BatchEntry {
                        url: url.clone(),
                        success: false,
                        filename: None,
                        error: Some(e.to_string()),
                    },
                }
            });

        futures::future::join_all(tasks).await
    }

    /// Tear down the shared browser at process shutdown
    pub async fn shutdown(&self) -> Result<()> {
        self.browser.shutdown().await
    }
}

/// Build a collision-resistant screenshot filename from a sanitized ISO
/// timestamp and a random alphanumeric suffix.
pub fn screenshot_filename() -> String {
    let timestamp = Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("screenshot-{timestamp}-{suffix}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserConfig;

    #[test]
    fn test_screenshot_filename_shape() {
        let name = screenshot_filename();
        assert!(name.starts_with("screenshot-"));
        assert!(name.ends_with(".png"));
        // Sanitized timestamp must not carry filesystem-hostile characters
        assert!(!name.contains(':'));
        let stem = name.trim_end_matches(".png");
        assert!(!stem.contains('.'));
    }

    #[test]
    fn test_screenshot_filenames_are_unique() {
        let a = screenshot_filename();
        let b = screenshot_filename();
        assert_ne!(a, b);
    }

    #[test]
    fn test_service_does_not_launch_browser_eagerly() {
        let service = ScreenshotService::new(BrowserConfig::default());
        assert!(!service.browser_running());
    }

    #[tokio::test]
    async fn test_capture_rejects_invalid_url_before_launch() {
        let service = ScreenshotService::new(BrowserConfig::default());
        let err = service
            .capture("not-a-url", &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        // Validation failures must not spin up Chromium
        assert!(!service.browser_running());
    }

    #[tokio::test]
    async fn test_batch_filters_blank_urls_without_launch() {
        let service = ScreenshotService::new(BrowserConfig::default());
        let urls = vec!["".to_string(), "   ".to_string()];
        let results = service
            .capture_batch(
                &urls,
                &CaptureOptions::default(),
                std::path::Path::new("static/screenshots"),
            )
            .await;
        assert!(results.is_empty());
        assert!(!service.browser_running());
    }

    #[tokio::test]
    async fn test_batch_isolates_per_url_failures() {
        // Invalid URLs fail during validation, before any browser launch,
        // so each entry gets an independent error record.
        let service = ScreenshotService::new(BrowserConfig::default());
        let urls = vec!["bad-url-one".to_string(), "bad-url-two".to_string()];
        let results = service
            .capture_batch(
                &urls,
                &CaptureOptions::default(),
                std::path::Path::new("static/screenshots"),
            )
            .await;
        assert_eq!(results.len(), 2);
        for entry in &results {
            assert!(!entry.success);
            assert!(entry.filename.is_none());
            assert!(entry.error.is_some());
        }
        assert!(!service.browser_running());
    }

    #[test]
    fn test_batch_entry_serialization_skips_absent_fields() {
        let entry = BatchEntry {
            url: "https://example.com".to_string(),
            success: true,
            filename: Some("screenshot-x.png".to_string()),
            error: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"filename\""));
        assert!(!json.contains("\"error\""));
    }
}
