//! Browser engine and session error types.

use thiserror::Error;

/// Errors surfaced by a browser engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("browser connection closed: {0}")]
    ConnectionClosed(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl EngineError {
    /// Whether this error belongs to the navigation/timeout class that a
    /// send is allowed to retry once after re-entering the entry URL.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NavigationFailed(_) | Self::Timeout(_))
    }
}

impl From<chromiumoxide::error::CdpError> for EngineError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        EngineError::Cdp(err.to_string())
    }
}

/// Errors surfaced by the session lifecycle controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be brought up. The controller has already
    /// released partial resources and settled back to `Uninitialized`.
    #[error("session initialization failed: {0}")]
    Initialization(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
