//! Browser lifecycle management
//!
//! This module handles browser launch, shutdown, and page management,
//! including the process-wide shared browser instance.

use crate::error::{BrowserError, Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Default desktop user agent applied to capture pages
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Version/17.0 Safari/537.36";

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Viewport width (default: 1920)
    pub width: u32,
    /// Viewport height (default: 1280)
    pub height: u32,
    /// Device scale factor (default: 2.0)
    pub device_scale_factor: f64,
    /// Enable sandbox (default: true; disabled in production containers)
    pub sandbox: bool,
    /// User agent applied to every new page
    pub user_agent: Option<String>,
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1280,
            device_scale_factor: 2.0,
            sandbox: true,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            timeout_ms: 30000,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Preset for containerized production deployments.
    ///
    /// Disables the sandbox, points at the distro Chromium binary, and
    /// adjusts font rendering for headless environments.
    pub fn production() -> Self {
        Self {
            sandbox: false,
            chrome_path: Some("/usr/bin/chromium-browser".to_string()),
            extra_args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--font-render-hinting=none".to_string(),
                "--disable-font-subpixel-positioning".to_string(),
            ],
            ..Default::default()
        }
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Set the device scale factor
    pub fn device_scale_factor(mut self, factor: f64) -> Self {
        self.config.device_scale_factor = factor;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Set navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Handle to an open browser page.
///
/// Pages are created per request and must not outlive the request; callers
/// close the handle on every exit path, success or failure.
pub struct PageHandle {
    pub(crate) page: Page,
}

impl PageHandle {
    /// Get the underlying chromiumoxide Page
    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Close the page
    pub async fn close(self) -> Result<()> {
        self.page
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        Ok(())
    }
}

/// High-level browser controller
pub struct BrowserController {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    config: BrowserConfig,
}

impl BrowserController {
    /// Create a new browser controller with default config
    #[instrument]
    pub async fn new() -> Result<Self> {
        Self::with_config(BrowserConfig::default()).await
    }

    /// Create a new browser controller with custom config
    #[instrument(skip(config))]
    pub async fn with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser with config: headless={}, viewport={}x{}",
            config.headless, config.width, config.height
        );

        let mut builder = CdpBrowserConfig::builder();

        builder = builder.viewport(chromiumoxide::handler::viewport::Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: Some(config.device_scale_factor),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        // chromiumoxide defaults to headless; with_head opts out
        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Spawn handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser launched successfully");

        Ok(Self {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handler_task)),
            config,
        })
    }

    /// Create a new page/tab with the configured user agent applied
    #[instrument(skip(self))]
    pub async fn new_page(&self) -> Result<PageHandle> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        if let Some(ref ua) = self.config.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(ua.clone())
                .build()
                .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
            page.execute(params)
                .await
                .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        }

        debug!("Created new page");
        Ok(PageHandle { page })
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser and wait for the handler task to finish
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<()> {
        info!("Closing browser");

        self.browser
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;

        if let Some(handler) = self.handler.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handler).await;
        }

        info!("Browser closed");
        Ok(())
    }
}

/// Lazily launched browser shared by every request for the life of the
/// server process.
///
/// The first `acquire` launches Chromium; concurrent first calls are
/// single-flighted through a `OnceCell`, so exactly one browser process is
/// created no matter how many requests race on startup. The instance is
/// reused until `shutdown` tears it down at process exit.
pub struct SharedBrowser {
    config: BrowserConfig,
    cell: OnceCell<BrowserController>,
}

impl SharedBrowser {
    /// Create a shared browser that will launch with the given config on
    /// first use
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Get the shared browser, launching it on first call
    pub async fn acquire(&self) -> Result<&BrowserController> {
        self.cell
            .get_or_try_init(|| async {
                info!("Launching shared Chromium instance");
                BrowserController::with_config(self.config.clone()).await
            })
            .await
    }

    /// Whether the browser has been launched
    pub fn is_running(&self) -> bool {
        self.cell.initialized()
    }

    /// The launch configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser if it was ever launched
    pub async fn shutdown(&self) -> Result<()> {
        match self.cell.get() {
            Some(controller) => controller.close().await,
            None => Ok(()),
        }
    }
}
