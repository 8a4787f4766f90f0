//! The send sequence against the WhatsApp Web client.
//!
//! A send walks a fixed series of bounded steps: open the chat through the
//! deep link, clear transient overlays, check for an invalid recipient,
//! locate the composer, replace the pre-filled text by typing the body,
//! press Enter, and confirm the acknowledgment marker. Every wait carries
//! an explicit timeout, so a send can be slow but never wedged.

use std::{sync::Arc, time::Duration};

use {
    herald_browser::{EngineError, EnginePage, SessionController},
    herald_config::WhatsAppConfig,
    tokio::time::sleep,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Context as _, Error, Result},
    outcome::{RejectReason, SendOutcome},
    phone,
};

/// At most one extra attempt after a transient navigation/timeout failure.
const MAX_SEND_ATTEMPTS: usize = 2;

/// Drives individual sends over the shared session page.
pub struct MessageDriver {
    session: Arc<SessionController>,
    cfg: WhatsAppConfig,
}

impl MessageDriver {
    pub fn new(session: Arc<SessionController>, cfg: &WhatsAppConfig) -> Self {
        Self {
            session,
            cfg: cfg.clone(),
        }
    }

    /// Bring the session up before a batch. Failures here propagate;
    /// failures mid-batch become per-recipient outcomes instead.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.session.initialize().await?;
        Ok(())
    }

    /// Send one message. Infallible by value: every failure mode maps to
    /// a terminal [`SendOutcome`].
    pub async fn send(&self, recipient: &str, body: &str) -> SendOutcome {
        let dial = match phone::normalize(
            recipient,
            &self.cfg.country_code,
            self.cfg.min_phone_digits,
        ) {
            Ok(dial) => dial,
            Err(reason) => {
                info!(recipient, %reason, "recipient rejected before dialing");
                return SendOutcome::Rejected { reason };
            },
        };

        let mut attempts = 0usize;
        loop {
            attempts += 1;
            match self.attempt(&dial, body).await {
                Ok(outcome) => {
                    info!(recipient, dial_string = %dial, outcome = %outcome.describe(), "send finished");
                    return outcome;
                },
                Err(e) if e.is_transient() && attempts < MAX_SEND_ATTEMPTS => {
                    warn!(
                        recipient,
                        dial_string = %dial,
                        attempts,
                        max_attempts = MAX_SEND_ATTEMPTS,
                        error = %e,
                        "transient send failure, re-entering the web client"
                    );
                    if let Err(recover_err) = self.recover().await {
                        warn!(recipient, error = %recover_err, "recovery navigation failed");
                        return SendOutcome::failed(format!("sending to {dial}: {e}"));
                    }
                },
                Err(e) => {
                    warn!(recipient, dial_string = %dial, error = %e, "send failed");
                    return SendOutcome::failed(format!("sending to {dial}: {e}"));
                },
            }
        }
    }

    async fn attempt(&self, dial: &str, body: &str) -> Result<SendOutcome> {
        let page = self.session.page().await?;
        let page = page.as_ref();

        self.open_chat(page, dial, body).await?;
        self.dismiss_overlays(page).await;

        if self.recipient_invalid(page).await? {
            self.dismiss_invalid_dialog(page).await;
            return Ok(SendOutcome::Rejected {
                reason: RejectReason::NotRegistered,
            });
        }

        let composer = self.locate_composer(page).await?;

        // Triple-click selects the pre-filled line, Backspace removes it.
        page.click(&composer, 3).await?;
        sleep(self.settle()).await;
        page.press_key("Backspace").await?;

        page.type_text(body, Duration::from_millis(self.cfg.type_delay_ms))
            .await?;
        page.press_key("Enter").await?;
        sleep(Duration::from_millis(self.cfg.post_send_settle_ms)).await;

        if self.confirm_sent(page, body, &composer).await? {
            Ok(SendOutcome::Sent)
        } else {
            Ok(SendOutcome::failed("message not confirmed as sent"))
        }
    }

    fn deep_link(&self, dial: &str, body: &str) -> String {
        format!(
            "{}/send?phone={dial}&text={}",
            self.cfg.entry_url.trim_end_matches('/'),
            urlencoding::encode(body)
        )
    }

    /// Navigate to the recipient's chat. Re-dialing the recipient already
    /// on screen reloads instead, resetting any half-typed state.
    async fn open_chat(&self, page: &dyn EnginePage, dial: &str, body: &str) -> Result<()> {
        let current = page.current_url().await.unwrap_or_default();
        if current.contains(&format!("phone={dial}")) {
            debug!(dial_string = dial, "already on this chat, reloading");
            page.reload().await?;
        } else {
            page.goto(&self.deep_link(dial, body)).await?;
        }
        sleep(Duration::from_millis(self.cfg.post_navigation_settle_ms)).await;
        Ok(())
    }

    /// Close whatever popups sit over the conversation. Absence of a
    /// close control is the normal case, not an error.
    async fn dismiss_overlays(&self, page: &dyn EnginePage) {
        for selector in &self.cfg.selectors.overlay_close {
            match page.has_selector(selector).await {
                Ok(true) => {
                    debug!(selector, "dismissing overlay");
                    if page.click(selector, 1).await.is_ok() {
                        sleep(self.settle()).await;
                    }
                },
                Ok(false) => {},
                Err(e) => debug!(selector, error = %e, "overlay probe failed"),
            }
        }
    }

    /// Detect the "invalid number" response. Content markers are checked
    /// first since CSS alone cannot express text matching, then the
    /// dialog selector chain gets a bounded wait per candidate.
    async fn recipient_invalid(&self, page: &dyn EnginePage) -> Result<bool> {
        let content = page.content().await?.to_lowercase();
        for marker in &self.cfg.selectors.invalid_markers {
            if content.contains(marker.as_str()) {
                debug!(marker, "invalid-recipient marker in page content");
                return Ok(true);
            }
        }

        let timeout = Duration::from_millis(self.cfg.invalid_check_timeout_ms);
        for selector in &self.cfg.selectors.invalid_dialog {
            match page.wait_for_selector(selector, false, timeout).await {
                Ok(()) => {
                    debug!(selector, "invalid-recipient dialog present");
                    return Ok(true);
                },
                Err(EngineError::Timeout(_)) => {},
                Err(e) => return Err(e.into()),
            }
        }
        Ok(false)
    }

    async fn dismiss_invalid_dialog(&self, page: &dyn EnginePage) {
        for selector in &self.cfg.selectors.dialog_confirm {
            if let Ok(true) = page.has_selector(selector).await {
                debug!(selector, "dismissing invalid-recipient dialog");
                if page.click(selector, 1).await.is_ok() {
                    sleep(self.settle()).await;
                }
                return;
            }
        }
    }

    /// Walk the composer chain, first visible candidate wins. The chain
    /// shares one timeout budget so a long chain cannot multiply the wait.
    async fn locate_composer(&self, page: &dyn EnginePage) -> Result<String> {
        let chain = &self.cfg.selectors.composer;
        let budget = Duration::from_millis(self.cfg.selector_timeout_ms);
        let slice = budget / chain.len().max(1) as u32;

        for selector in chain {
            match page.wait_for_selector(selector, true, slice).await {
                Ok(()) => {
                    debug!(selector, "composer located");
                    return Ok(selector.clone());
                },
                Err(EngineError::Timeout(_)) => {},
                Err(e) => return Err(e.into()),
            }
        }

        // Tell a dead page apart from an unrendered input.
        page.current_url()
            .await
            .context("page lost while locating the composer input")?;
        Err(Error::message("composer input not found in any candidate"))
    }

    /// Confirm the message left the composer. The ack-marker chain is the
    /// strong signal; the composer no longer holding the body is the weak
    /// fallback.
    async fn confirm_sent(
        &self,
        page: &dyn EnginePage,
        body: &str,
        composer: &str,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(self.cfg.ack_timeout_ms);
        for selector in &self.cfg.selectors.sent_ack {
            match page.wait_for_selector(selector, false, timeout).await {
                Ok(()) => {
                    debug!(selector, "send acknowledged");
                    return Ok(true);
                },
                Err(EngineError::Timeout(_)) => {},
                Err(e) => return Err(e.into()),
            }
        }

        let residue = page.element_text(composer).await?.unwrap_or_default();
        Ok(!residue.contains(body))
    }

    /// Between attempts, leave whatever broken state the failed send left
    /// behind and wait for the client to stabilize.
    async fn recover(&self) -> Result<()> {
        let page = self.session.page().await?;
        page.goto(&self.cfg.entry_url).await?;
        sleep(Duration::from_millis(self.cfg.post_navigation_settle_ms)).await;
        Ok(())
    }

    fn settle(&self) -> Duration {
        Duration::from_millis(self.cfg.settle_ms)
    }
}
