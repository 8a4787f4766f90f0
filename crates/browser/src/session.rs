//! Lifecycle controller for the single long-lived WhatsApp Web session.
//!
//! One controller instance exists per process, injected into whatever layer
//! needs it. It owns the browser context and page exclusively; everything
//! else borrows the page through [`SessionController::page`].

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    herald_config::HeraldConfig,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    engine::{BrowserEngine, EngineContext, EnginePage, LaunchOptions},
    error::{EngineError, SessionError},
    profile::ProfileStore,
};

/// Lifecycle states of the session.
///
/// `Failed` is a transition, not a resting state: a failed initialization
/// settles back to `Uninitialized` so the next call may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// Pairing information surfaced to the operator.
#[derive(Debug, Clone)]
pub struct PairingStatus {
    /// Whether the session is paired and able to send.
    pub ready: bool,
    /// PNG of the QR element, or a full-page screenshot when the QR has
    /// not rendered yet. `None` once ready.
    pub qr_image: Option<Vec<u8>>,
}

#[derive(Default)]
struct SessionResources {
    context: Option<Box<dyn EngineContext>>,
    page: Option<Arc<dyn EnginePage>>,
}

/// Owns the one browser session: lazy initialization, readiness and
/// pairing probes, teardown.
pub struct SessionController {
    engine: Box<dyn BrowserEngine>,
    session_id: String,
    launch: LaunchOptions,
    profile: ProfileStore,
    entry_url: String,
    ready_selectors: Vec<String>,
    qr_selectors: Vec<String>,
    identity_selectors: Vec<String>,
    qr_wait: Duration,
    state: RwLock<SessionState>,
    resources: Mutex<SessionResources>,
}

impl SessionController {
    pub fn new(
        engine: Box<dyn BrowserEngine>,
        profile_dir: impl Into<PathBuf>,
        cfg: &HeraldConfig,
    ) -> Self {
        Self {
            engine,
            session_id: generate_session_id(),
            launch: LaunchOptions::from(&cfg.browser),
            profile: ProfileStore::new(profile_dir),
            entry_url: cfg.whatsapp.entry_url.clone(),
            ready_selectors: cfg.whatsapp.selectors.ready.clone(),
            qr_selectors: cfg.whatsapp.selectors.qr.clone(),
            identity_selectors: cfg.whatsapp.selectors.identity.clone(),
            qr_wait: Duration::from_millis(cfg.whatsapp.selector_timeout_ms),
            state: RwLock::new(SessionState::Uninitialized),
            resources: Mutex::new(SessionResources::default()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current lifecycle state, observable without waiting on the
    /// initialization lock.
    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(SessionState::Uninitialized)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
        debug!(session_id = %self.session_id, state = %next, "session state");
    }

    /// Bring the session up. Idempotent; concurrent callers are serialized
    /// and every one of them observes the same outcome.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let mut resources = self.resources.lock().await;

        if self.state() == SessionState::Ready && resources.page.is_some() {
            debug!(session_id = %self.session_id, "session already initialized");
            return Ok(());
        }

        self.set_state(SessionState::Initializing);
        info!(
            session_id = %self.session_id,
            profile = %self.profile.dir().display(),
            "initializing session"
        );

        match self.bring_up(&mut resources).await {
            Ok(()) => {
                self.set_state(SessionState::Ready);
                info!(session_id = %self.session_id, "session ready");
                Ok(())
            },
            Err(e) => {
                // Release partial resources before settling back.
                self.release(&mut resources).await;
                self.set_state(SessionState::Failed);
                warn!(session_id = %self.session_id, error = %e, "session initialization failed");
                self.set_state(SessionState::Uninitialized);
                Err(SessionError::Initialization(e.to_string()))
            },
        }
    }

    async fn bring_up(&self, resources: &mut SessionResources) -> Result<(), EngineError> {
        self.profile.ensure().map_err(|e| {
            EngineError::LaunchFailed(format!(
                "profile directory {}: {e}",
                self.profile.dir().display()
            ))
        })?;

        let context = self.engine.launch(self.profile.dir(), &self.launch).await?;
        let page = context.page().await?;

        // The restored tab may already sit on the web client.
        let url = page.current_url().await.unwrap_or_default();
        if !url.starts_with(&self.entry_url) {
            debug!(session_id = %self.session_id, url, "navigating to entry URL");
            page.goto(&self.entry_url).await?;
        }

        resources.context = Some(context);
        resources.page = Some(page);
        Ok(())
    }

    /// Borrow the session page, initializing first when needed.
    pub async fn page(&self) -> Result<Arc<dyn EnginePage>, SessionError> {
        {
            let resources = self.resources.lock().await;
            if self.state() == SessionState::Ready {
                if let Some(page) = &resources.page {
                    return Ok(page.clone());
                }
            }
        }

        self.initialize().await?;

        let resources = self.resources.lock().await;
        resources
            .page
            .clone()
            .ok_or_else(|| SessionError::Initialization("no page after initialization".into()))
    }

    /// Whether the paired chat UI is present. Degrades to `false` on any
    /// probe error; never propagates.
    pub async fn is_ready(&self) -> bool {
        let page = match self.page().await {
            Ok(page) => page,
            Err(e) => {
                debug!(session_id = %self.session_id, error = %e, "readiness probe could not obtain a page");
                return false;
            },
        };
        self.probe_ready(page.as_ref()).await
    }

    async fn probe_ready(&self, page: &dyn EnginePage) -> bool {
        for selector in &self.ready_selectors {
            match page.has_selector(selector).await {
                Ok(true) => return true,
                Ok(false) => {},
                Err(e) => {
                    debug!(selector, error = %e, "readiness probe error");
                    return false;
                },
            }
        }
        false
    }

    /// Pairing status for the operator. A QR element that has not rendered
    /// is not an error: the operator always gets image bytes to act on,
    /// falling back to a full-page screenshot.
    pub async fn pairing_status(&self) -> Result<PairingStatus, SessionError> {
        let page = self.page().await?;

        if self.probe_ready(page.as_ref()).await {
            return Ok(PairingStatus {
                ready: true,
                qr_image: None,
            });
        }

        if let Some(primary) = self.qr_selectors.first() {
            match page.wait_for_selector(primary, false, self.qr_wait).await {
                Ok(()) => {},
                Err(e) => {
                    debug!(
                        session_id = %self.session_id,
                        error = %e,
                        "QR element did not render, taking full-page screenshot"
                    );
                    let shot = page.screenshot(true).await?;
                    return Ok(PairingStatus {
                        ready: false,
                        qr_image: Some(shot),
                    });
                },
            }
        }

        for selector in &self.qr_selectors {
            if let Ok(true) = page.has_selector(selector).await {
                match page.element_screenshot(selector).await {
                    Ok(shot) => {
                        return Ok(PairingStatus {
                            ready: false,
                            qr_image: Some(shot),
                        });
                    },
                    Err(e) => {
                        debug!(selector, error = %e, "QR element screenshot failed, trying next candidate");
                    },
                }
            }
        }

        let shot = page.screenshot(true).await?;
        Ok(PairingStatus {
            ready: false,
            qr_image: Some(shot),
        })
    }

    /// Best-effort probe for the paired account's own number.
    pub async fn connected_identity(&self) -> Option<String> {
        let page = self.page().await.ok()?;

        for selector in &self.identity_selectors {
            if let Ok(Some(title)) = page.element_attribute(selector, "title").await {
                if title.contains('+') {
                    return Some(title);
                }
            }
            if let Ok(Some(text)) = page.element_text(selector).await {
                if text.contains('+') {
                    return Some(text.trim().to_string());
                }
            }
        }

        None
    }

    /// Close the page and context and drop the engine resources, keeping
    /// the profile (and therefore the pairing) on disk.
    pub async fn shutdown(&self) {
        let mut resources = self.resources.lock().await;
        self.release(&mut resources).await;
        self.set_state(SessionState::Uninitialized);
        debug!(session_id = %self.session_id, "session shut down");
    }

    /// Full logout: close everything and delete the profile directory.
    /// The next initialize starts unpaired. Idempotent; repeat calls are
    /// no-ops.
    pub async fn teardown(&self) {
        let mut resources = self.resources.lock().await;
        self.release(&mut resources).await;
        self.set_state(SessionState::Uninitialized);
        self.profile.remove().await;
        info!(session_id = %self.session_id, "session torn down");
    }

    async fn release(&self, resources: &mut SessionResources) {
        if let Some(page) = resources.page.take() {
            if let Err(e) = page.close().await {
                debug!(session_id = %self.session_id, error = %e, "page close failed");
            }
        }
        if let Some(context) = resources.context.take() {
            if let Err(e) = context.close().await {
                warn!(session_id = %self.session_id, error = %e, "context close failed");
            }
        }
    }
}

/// Generate a random session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let id: u64 = rng.random();
    format!("session-{:016x}", id)
}
