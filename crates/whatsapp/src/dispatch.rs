//! Sequential dispatch for single and bulk send requests.
//!
//! Everything funnels through one lock: no matter how many API calls
//! arrive concurrently, at most one message is in flight per session.

use std::time::Duration;

use {
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    driver::MessageDriver,
    error::Result,
    outcome::{BatchResult, RecipientOutcome, SendOutcome},
};

const MIN_BULK_DELAY_SECS: u64 = 1;
const MAX_BULK_DELAY_SECS: u64 = 60;

/// Fans requests out to the driver one recipient at a time.
pub struct Dispatcher {
    driver: MessageDriver,
    send_lock: Mutex<()>,
    default_delay_secs: u64,
}

impl Dispatcher {
    pub fn new(driver: MessageDriver, default_delay_secs: u64) -> Self {
        Self {
            driver,
            send_lock: Mutex::new(()),
            default_delay_secs,
        }
    }

    /// Send to a single recipient field, which may carry several numbers
    /// separated by commas. No delay between them.
    pub async fn dispatch_single(&self, recipient_field: &str, body: &str) -> Result<BatchResult> {
        let recipients = split_recipients(recipient_field);
        self.run(recipients, body, None).await
    }

    /// Send to a list of recipients with a pause between each.
    /// `delay_secs` falls back to the configured default and is clamped
    /// into 1..=60 either way.
    pub async fn dispatch_bulk(
        &self,
        recipients: &[String],
        body: &str,
        delay_secs: Option<u64>,
    ) -> Result<BatchResult> {
        let recipients: Vec<String> = recipients
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        let delay = clamp_delay(delay_secs.unwrap_or(self.default_delay_secs));
        self.run(recipients, body, Some(Duration::from_secs(delay)))
            .await
    }

    async fn run(
        &self,
        recipients: Vec<String>,
        body: &str,
        delay: Option<Duration>,
    ) -> Result<BatchResult> {
        let _guard = self.send_lock.lock().await;

        self.driver.ensure_ready().await?;

        let total = recipients.len();
        let mut per_recipient = Vec::with_capacity(total);

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 {
                if let Some(delay) = delay {
                    debug!(delay_secs = delay.as_secs(), "pausing between sends");
                    tokio::time::sleep(delay).await;
                }
            }

            info!(recipient, position = index + 1, total, "dispatching message");
            let outcome = self.driver.send(recipient, body).await;
            if let SendOutcome::Failed { reason } = &outcome {
                warn!(recipient, reason, "recipient failed, continuing with the rest");
            }

            per_recipient.push(RecipientOutcome {
                recipient: recipient.clone(),
                outcome,
            });
        }

        Ok(BatchResult::from_outcomes(per_recipient))
    }
}

/// Comma-split a recipient field, trimming and dropping empties.
fn split_recipients(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

fn clamp_delay(secs: u64) -> u64 {
    secs.clamp(MIN_BULK_DELAY_SECS, MAX_BULK_DELAY_SECS)
}
