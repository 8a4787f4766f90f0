//! Capability surface for browser automation engines.
//!
//! The session controller and the messaging driver only ever talk to these
//! traits. Any engine that can launch a persistent-profile browser context
//! and drive one page through them is substitutable; tests use scripted
//! fakes, production uses [`crate::cdp::CdpEngine`].

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::error::EngineError;

/// Options applied when launching a browser context.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit browser executable. Auto-detected when unset.
    pub chrome_path: Option<String>,
    /// Run without a visible window.
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Upper bound for individual CDP requests, navigation included.
    pub navigation_timeout_ms: u64,
    /// Extra command-line arguments for the browser process.
    pub chrome_args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from(&herald_config::BrowserConfig::default())
    }
}

impl From<&herald_config::BrowserConfig> for LaunchOptions {
    fn from(cfg: &herald_config::BrowserConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            navigation_timeout_ms: cfg.navigation_timeout_ms,
            chrome_args: cfg.chrome_args.clone(),
        }
    }
}

/// Launches browser contexts bound to a persistent profile directory.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch a context whose login state lives in `profile_dir`.
    async fn launch(
        &self,
        profile_dir: &Path,
        opts: &LaunchOptions,
    ) -> Result<Box<dyn EngineContext>, EngineError>;
}

/// A running browser context owning its pages.
#[async_trait]
pub trait EngineContext: Send + Sync {
    /// Adopt the first open page, or open a fresh one.
    async fn page(&self) -> Result<Arc<dyn EnginePage>, EngineError>;

    /// Close the context and the underlying browser process.
    async fn close(&self) -> Result<(), EngineError>;
}

/// A single driveable page.
///
/// Every waiting primitive carries an explicit timeout and resolves to a
/// typed [`EngineError`] instead of hanging.
#[async_trait]
pub trait EnginePage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), EngineError>;

    async fn reload(&self) -> Result<(), EngineError>;

    async fn current_url(&self) -> Result<String, EngineError>;

    /// Full page markup, used for content-marker detection.
    async fn content(&self) -> Result<String, EngineError>;

    /// Instant presence probe, no waiting.
    async fn has_selector(&self, selector: &str) -> Result<bool, EngineError>;

    /// Poll until the selector matches (and, when `visible`, has a
    /// non-empty box). `Err(EngineError::Timeout)` past the deadline.
    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    /// Click the first match `click_count` times (3 selects a line).
    async fn click(&self, selector: &str, click_count: u32) -> Result<(), EngineError>;

    /// Type into the focused element, one key event pair per character.
    async fn type_text(&self, text: &str, per_char_delay: Duration) -> Result<(), EngineError>;

    /// Press a named key ("Enter", "Backspace") on the focused element.
    async fn press_key(&self, key: &str) -> Result<(), EngineError>;

    /// Inner text of the first match, `None` when absent.
    async fn element_text(&self, selector: &str) -> Result<Option<String>, EngineError>;

    /// Attribute of the first match, `None` when absent or unset.
    async fn element_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, EngineError>;

    /// PNG screenshot of the viewport or the whole page.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, EngineError>;

    /// PNG screenshot cropped to the first match.
    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}
