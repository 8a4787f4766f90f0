//! Scripted browser fakes shared by the driver and dispatch tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashSet,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    herald_browser::{
        BrowserEngine, EngineContext, EngineError, EnginePage, LaunchOptions, SessionController,
    },
    herald_config::{HeraldConfig, WhatsAppConfig},
};

/// Config with real selector chains but millisecond-scale waits.
pub(crate) fn fast_config() -> HeraldConfig {
    let whatsapp = WhatsAppConfig {
        selector_timeout_ms: 100,
        invalid_check_timeout_ms: 20,
        ack_timeout_ms: 20,
        settle_ms: 1,
        post_navigation_settle_ms: 1,
        post_send_settle_ms: 1,
        type_delay_ms: 0,
        bulk_delay_secs: 1,
        ..WhatsAppConfig::default()
    };
    HeraldConfig {
        whatsapp,
        ..HeraldConfig::default()
    }
}

/// A page whose DOM reactions are scripted per test.
pub(crate) struct ScriptedPage {
    url: Mutex<String>,
    content: Mutex<String>,
    present: Mutex<HashSet<String>>,
    composer_text: Mutex<String>,
    /// Selector added to the page when Enter commits a message.
    ack_on_enter: Mutex<Option<String>>,
    /// Whether Enter empties the composer, as a real send does.
    clear_composer_on_enter: AtomicBool,
    /// Deep-link navigations left to fail with a navigation error.
    pub failing_send_gotos: AtomicUsize,
    pub goto_count: AtomicUsize,
    pub reload_count: AtomicUsize,
    pub clicks: Mutex<Vec<String>>,
    gotos: Mutex<Vec<String>>,
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self {
            url: Mutex::new(String::new()),
            content: Mutex::new(String::new()),
            present: Mutex::new(HashSet::new()),
            composer_text: Mutex::new(String::new()),
            ack_on_enter: Mutex::new(None),
            clear_composer_on_enter: AtomicBool::new(true),
            failing_send_gotos: AtomicUsize::new(0),
            goto_count: AtomicUsize::new(0),
            reload_count: AtomicUsize::new(0),
            clicks: Mutex::new(Vec::new()),
            gotos: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedPage {
    pub fn add_selector(&self, selector: &str) {
        self.present.lock().unwrap().insert(selector.to_string());
    }

    pub fn remove_selector(&self, selector: &str) {
        self.present.lock().unwrap().remove(selector);
    }

    pub fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
    }

    pub fn ack_on_enter(&self, selector: &str) {
        *self.ack_on_enter.lock().unwrap() = Some(selector.to_string());
    }

    pub fn keep_composer_text_on_enter(&self) {
        self.clear_composer_on_enter.store(false, Ordering::SeqCst);
    }

    pub fn last_goto(&self) -> String {
        self.gotos.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl EnginePage for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<(), EngineError> {
        self.goto_count.fetch_add(1, Ordering::SeqCst);
        if url.contains("/send?") && self.failing_send_gotos.load(Ordering::SeqCst) > 0 {
            self.failing_send_gotos.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::NavigationFailed("net::ERR_ABORTED".into()));
        }
        *self.url.lock().unwrap() = url.to_string();
        self.gotos.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn reload(&self) -> Result<(), EngineError> {
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn content(&self) -> Result<String, EngineError> {
        Ok(self.content.lock().unwrap().clone())
    }

    async fn has_selector(&self, selector: &str) -> Result<bool, EngineError> {
        Ok(self.present.lock().unwrap().contains(selector))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _visible: bool,
        _timeout: Duration,
    ) -> Result<(), EngineError> {
        if self.present.lock().unwrap().contains(selector) {
            Ok(())
        } else {
            Err(EngineError::Timeout(format!("selector {selector}")))
        }
    }

    async fn click(&self, selector: &str, _click_count: u32) -> Result<(), EngineError> {
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, text: &str, _per_char_delay: Duration) -> Result<(), EngineError> {
        self.composer_text.lock().unwrap().push_str(text);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), EngineError> {
        match key {
            "Backspace" => self.composer_text.lock().unwrap().clear(),
            "Enter" => {
                if let Some(ack) = self.ack_on_enter.lock().unwrap().clone() {
                    self.present.lock().unwrap().insert(ack);
                }
                if self.clear_composer_on_enter.load(Ordering::SeqCst) {
                    self.composer_text.lock().unwrap().clear();
                }
            },
            _ => {},
        }
        Ok(())
    }

    async fn element_text(&self, _selector: &str) -> Result<Option<String>, EngineError> {
        Ok(Some(self.composer_text.lock().unwrap().clone()))
    }

    async fn element_attribute(
        &self,
        _selector: &str,
        _name: &str,
    ) -> Result<Option<String>, EngineError> {
        Ok(None)
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, EngineError> {
        Ok(b"png".to_vec())
    }

    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>, EngineError> {
        if self.present.lock().unwrap().contains(selector) {
            Ok(b"png".to_vec())
        } else {
            Err(EngineError::ElementNotFound(selector.to_string()))
        }
    }

    async fn close(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

pub(crate) struct FakeEngine {
    page: Arc<ScriptedPage>,
    pub launch_failures: AtomicUsize,
}

impl FakeEngine {
    pub fn new(page: Arc<ScriptedPage>) -> Self {
        Self {
            page,
            launch_failures: AtomicUsize::new(0),
        }
    }
}

struct FakeContext {
    page: Arc<ScriptedPage>,
}

#[async_trait]
impl EngineContext for FakeContext {
    async fn page(&self) -> Result<Arc<dyn EnginePage>, EngineError> {
        let page: Arc<dyn EnginePage> = self.page.clone();
        Ok(page)
    }

    async fn close(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(
        &self,
        _profile_dir: &Path,
        _opts: &LaunchOptions,
    ) -> Result<Box<dyn EngineContext>, EngineError> {
        if self.launch_failures.load(Ordering::SeqCst) > 0 {
            self.launch_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::LaunchFailed("no display".into()));
        }
        Ok(Box::new(FakeContext {
            page: self.page.clone(),
        }))
    }
}

/// Session controller over a scripted page, profile under `dir`.
pub(crate) fn session_with(
    page: Arc<ScriptedPage>,
    dir: &Path,
    cfg: &HeraldConfig,
) -> Arc<SessionController> {
    session_from_engine(FakeEngine::new(page), dir, cfg)
}

pub(crate) fn session_from_engine(
    engine: FakeEngine,
    dir: &Path,
    cfg: &HeraldConfig,
) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        Box::new(engine),
        dir.join("profile"),
        cfg,
    ))
}
