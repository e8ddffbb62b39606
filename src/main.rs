//! pageshot server binary
//!
//! Serves the screenshot API over HTTP with a lazily launched shared
//! Chromium instance, torn down explicitly on shutdown.

use anyhow::Context;
use clap::Parser;
use pageshot::browser::BrowserConfig;
use pageshot::handlers::{app_router, AppState, RuntimeSettings};
use pageshot::service::ScreenshotService;
use std::path::PathBuf;
use std::sync::Arc;

/// pageshot - URL screenshot web service
#[derive(Parser, Debug)]
#[command(name = "pageshot")]
#[command(version)]
#[command(about = "URL screenshot web service backed by headless Chromium")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Run the browser in headless mode
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Use the production launch preset (no sandbox, distro Chromium,
    /// headless font rendering flags)
    #[arg(long)]
    production: bool,

    /// Short-circuit all capture endpoints to a fixed 512 response
    #[arg(long)]
    maintenance: bool,

    /// Directory batch captures are saved into
    #[arg(long, default_value = "static/screenshots")]
    screenshots_dir: PathBuf,
}

impl Args {
    fn browser_config(&self) -> BrowserConfig {
        let mut config = if self.production {
            BrowserConfig::production()
        } else {
            BrowserConfig::default()
        };
        config.headless = self.headless;
        if let Some(ref path) = self.chrome_path {
            config.chrome_path = Some(path.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let service = ScreenshotService::new(args.browser_config());
    let settings = RuntimeSettings {
        maintenance: args.maintenance,
        screenshots_dir: args.screenshots_dir.clone(),
    };
    let state = Arc::new(AppState::new(service.clone(), settings));
    let app = app_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("pageshot listening on {}", addr);
    if args.maintenance {
        tracing::warn!("Maintenance mode active: capture endpoints are disabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down, closing browser");
    if let Err(e) = service.shutdown().await {
        tracing::warn!("Browser teardown failed: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install ctrl-c handler: {}", e);
    }
}
