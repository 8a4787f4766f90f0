//! chromiumoxide-backed implementation of the engine traits.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::{
            input::{
                DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
                DispatchMouseEventType, MouseButton,
            },
            page::CaptureScreenshotFormat,
        },
    },
    futures::StreamExt,
    serde::Deserialize,
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use crate::{
    engine::{BrowserEngine, EngineContext, EnginePage, LaunchOptions},
    error::EngineError,
};

/// Production engine driving a host Chromium over CDP.
pub struct CdpEngine;

#[async_trait]
impl BrowserEngine for CdpEngine {
    async fn launch(
        &self,
        profile_dir: &Path,
        opts: &LaunchOptions,
    ) -> Result<Box<dyn EngineContext>, EngineError> {
        // Fail with install guidance before chromiumoxide's own lookup runs.
        let detection = crate::detect::detect_browser(opts.chrome_path.as_deref());
        if !detection.found {
            return Err(EngineError::LaunchFailed(format!(
                "Chrome/Chromium not found. {}",
                detection.install_hint
            )));
        }

        let mut builder = CdpBrowserConfig::builder();

        // chromiumoxide defaults to headless
        if !opts.headless {
            builder = builder.with_head();
        }

        builder = builder
            .user_data_dir(profile_dir)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: opts.viewport_width,
                height: opts.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(opts.navigation_timeout_ms));

        if let Some(path) = detection.path {
            builder = builder.chrome_executable(path);
        }

        for arg in &opts.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(|e| {
            EngineError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            let install_hint = crate::detect::install_instructions();
            EngineError::LaunchFailed(format!("browser launch failed: {e}\n\n{install_hint}"))
        })?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!(?event, "browser event");
            }
            debug!("browser event handler exited (connection closed)");
        });

        Ok(Box::new(CdpContext {
            browser: Mutex::new(browser),
            events,
        }))
    }
}

struct CdpContext {
    browser: Mutex<Browser>,
    events: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl EngineContext for CdpContext {
    async fn page(&self) -> Result<Arc<dyn EnginePage>, EngineError> {
        let browser = self.browser.lock().await;

        // A persistent profile restores previous tabs; adopt the first one.
        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| EngineError::LaunchFailed(e.to_string()))?,
        };

        Ok(Arc::new(CdpPage { page }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed, process may already be gone");
        }
        let _ = browser.wait().await;
        self.events.abort();
        Ok(())
    }
}

struct CdpPage {
    page: Page,
}

#[derive(Deserialize)]
struct ElementCenter {
    x: f64,
    y: f64,
}

impl CdpPage {
    async fn eval_bool(&self, js: &str) -> Result<bool, EngineError> {
        Ok(self
            .page
            .evaluate(js)
            .await
            .map_err(|e| EngineError::JsEvalFailed(e.to_string()))?
            .into_value()
            .unwrap_or(false))
    }

    async fn dispatch_key(
        &self,
        event_type: DispatchKeyEventType,
        key: &str,
    ) -> Result<(), EngineError> {
        let (code, virtual_key, text) = match key {
            "Enter" => ("Enter", 13, Some("\r")),
            "Backspace" => ("Backspace", 8, None),
            other => (other, 0, None),
        };

        let mut builder = DispatchKeyEventParams::builder()
            .r#type(event_type.clone())
            .key(key)
            .code(code)
            .windows_virtual_key_code(virtual_key);
        if let (DispatchKeyEventType::KeyDown, Some(text)) = (event_type, text) {
            builder = builder.text(text);
        }
        let params = builder
            .build()
            .map_err(|e| EngineError::Cdp(e.to_string()))?;

        self.page
            .execute(params)
            .await
            .map_err(|e| EngineError::Cdp(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EnginePage for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), EngineError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| EngineError::NavigationFailed(e.to_string()))?;
        // Wait for network idle
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn reload(&self) -> Result<(), EngineError> {
        self.page
            .reload()
            .await
            .map_err(|e| EngineError::NavigationFailed(e.to_string()))?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, EngineError> {
        self.page.content().await.map_err(EngineError::from)
    }

    async fn has_selector(&self, selector: &str) -> Result<bool, EngineError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| EngineError::Cdp(e.to_string()))?;
        self.eval_bool(&format!("document.querySelector({quoted}) !== null"))
            .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| EngineError::Cdp(e.to_string()))?;

        let check_js = if visible {
            format!(
                r#"(() => {{
                    const el = document.querySelector({quoted});
                    if (!el) return false;
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    return rect.width > 0 && rect.height > 0
                        && style.visibility !== 'hidden' && style.display !== 'none';
                }})()"#
            )
        } else {
            format!("document.querySelector({quoted}) !== null")
        };

        let deadline = Instant::now() + timeout;
        let interval = Duration::from_millis(100);

        while Instant::now() < deadline {
            if self.eval_bool(&check_js).await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }

        Err(EngineError::Timeout(format!(
            "selector {selector} not found after {}ms",
            timeout.as_millis()
        )))
    }

    async fn click(&self, selector: &str, click_count: u32) -> Result<(), EngineError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| EngineError::Cdp(e.to_string()))?;

        // Scroll into view and resolve the element center in one pass.
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                if (!el) return null;
                el.scrollIntoView({{block: 'center', inline: 'center'}});
                const rect = el.getBoundingClientRect();
                return {{x: rect.x + rect.width / 2, y: rect.y + rect.height / 2}};
            }})()"#
        );

        let center: Option<ElementCenter> = self
            .page
            .evaluate(js.as_str())
            .await
            .map_err(|e| EngineError::JsEvalFailed(e.to_string()))?
            .into_value()
            .unwrap_or(None);

        let Some(center) = center else {
            return Err(EngineError::ElementNotFound(selector.to_string()));
        };

        // Small delay for scroll to complete
        tokio::time::sleep(Duration::from_millis(100)).await;

        // click_count counts up within the sequence so the browser groups
        // the presses into double/triple clicks.
        for count in 1..=click_count.max(1) {
            let press_cmd = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MousePressed)
                .x(center.x)
                .y(center.y)
                .button(MouseButton::Left)
                .click_count(count as i64)
                .build()
                .map_err(|e| EngineError::Cdp(e.to_string()))?;
            self.page
                .execute(press_cmd)
                .await
                .map_err(|e| EngineError::Cdp(e.to_string()))?;

            let release_cmd = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MouseReleased)
                .x(center.x)
                .y(center.y)
                .button(MouseButton::Left)
                .click_count(count as i64)
                .build()
                .map_err(|e| EngineError::Cdp(e.to_string()))?;
            self.page
                .execute(release_cmd)
                .await
                .map_err(|e| EngineError::Cdp(e.to_string()))?;
        }

        debug!(selector, click_count, "clicked element");
        Ok(())
    }

    async fn type_text(&self, text: &str, per_char_delay: Duration) -> Result<(), EngineError> {
        for c in text.chars() {
            let key_down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .text(c.to_string())
                .build()
                .map_err(|e| EngineError::Cdp(e.to_string()))?;
            self.page
                .execute(key_down)
                .await
                .map_err(|e| EngineError::Cdp(e.to_string()))?;

            let key_up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .text(c.to_string())
                .build()
                .map_err(|e| EngineError::Cdp(e.to_string()))?;
            self.page
                .execute(key_up)
                .await
                .map_err(|e| EngineError::Cdp(e.to_string()))?;

            if !per_char_delay.is_zero() {
                tokio::time::sleep(per_char_delay).await;
            }
        }

        debug!(chars = text.chars().count(), "typed text");
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), EngineError> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, key).await
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>, EngineError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| EngineError::Cdp(e.to_string()))?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                return el ? (el.innerText ?? el.textContent) : null;
            }})()"#
        );

        Ok(self
            .page
            .evaluate(js.as_str())
            .await
            .map_err(|e| EngineError::JsEvalFailed(e.to_string()))?
            .into_value()
            .unwrap_or(None))
    }

    async fn element_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| EngineError::Cdp(e.to_string()))?;
        let attr = serde_json::to_string(name).map_err(|e| EngineError::Cdp(e.to_string()))?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({quoted});
                return el ? el.getAttribute({attr}) : null;
            }})()"#
        );

        Ok(self
            .page
            .evaluate(js.as_str())
            .await
            .map_err(|e| EngineError::JsEvalFailed(e.to_string()))?
            .into_value()
            .unwrap_or(None))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, EngineError> {
        self.page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(full_page)
                    .build(),
            )
            .await
            .map_err(|e| EngineError::ScreenshotFailed(e.to_string()))
    }

    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>, EngineError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| EngineError::ElementNotFound(selector.to_string()))?;

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| EngineError::ScreenshotFailed(e.to_string()))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| EngineError::Cdp(e.to_string()))
    }
}
