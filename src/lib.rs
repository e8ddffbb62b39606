//! pageshot - URL screenshot web service
//!
//! This crate provides an HTTP backend that captures PNG screenshots of
//! URLs with a shared headless Chromium instance driven over CDP.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──▶ Axum Router ──▶ ScreenshotService ──▶ SharedBrowser (CDP)
//!                      │                  │
//!                      ▼                  ▼
//!               PNG / SSE / JSON    per-request Page
//!                                  (navigate, screenshot, close)
//! ```
//!
//! Every endpoint goes through one capture capability: the
//! [`service::ScreenshotService`] opens a page on the lazily launched shared
//! browser, navigates with a network-idle wait, screenshots, and closes the
//! page on every exit path.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pageshot::browser::{BrowserConfig, CaptureOptions};
//! use pageshot::service::ScreenshotService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ScreenshotService::new(BrowserConfig::default());
//!     let capture = service
//!         .capture("https://example.com", &CaptureOptions::viewport())
//!         .await?;
//!     println!("Captured {} bytes", capture.size);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod service;

// Re-exports for convenience
pub use browser::{BrowserConfig, SharedBrowser};
pub use error::{Error, Result};
pub use handlers::{app_router, AppState, RuntimeSettings};
pub use service::ScreenshotService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
