//! Browser automation module
//!
//! This module provides high-level browser control through ChromiumOxide,
//! including lifecycle management, navigation, and screenshot capture.

pub mod capture;
pub mod controller;
pub mod navigation;

pub use capture::{CaptureOptions, CaptureResult, PageCapture};
pub use controller::{
    BrowserConfig, BrowserController, PageHandle, SharedBrowser, DEFAULT_USER_AGENT,
};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator, UrlValidator, WaitUntil};
