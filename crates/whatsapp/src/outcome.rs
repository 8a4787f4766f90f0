//! Per-recipient send outcomes and batch summaries.

use serde::{Deserialize, Serialize};

/// Why a recipient was refused without a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The web client flagged the number as not registered.
    NotRegistered,
    /// The number did not survive normalization.
    InvalidNumber,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotRegistered => "number not registered on WhatsApp",
            Self::InvalidNumber => "invalid phone number",
        })
    }
}

/// Terminal result of one send for one recipient. Exactly one of these
/// exists per recipient per dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent,
    Rejected { reason: RejectReason },
    Failed { reason: String },
}

impl SendOutcome {
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// Human-readable line for logs and response summaries.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Sent => "sent".into(),
            Self::Rejected { reason } => format!("rejected: {reason}"),
            Self::Failed { reason } => format!("failed: {reason}"),
        }
    }
}

/// One row of a batch result, keyed by the recipient as given in the
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    #[serde(flatten)]
    pub outcome: SendOutcome,
}

/// Summary of a dispatch run. Rows preserve input order, duplicates
/// included; `succeeded + failed == total` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub per_recipient: Vec<RecipientOutcome>,
}

impl BatchResult {
    #[must_use]
    pub fn from_outcomes(per_recipient: Vec<RecipientOutcome>) -> Self {
        let total = per_recipient.len();
        let succeeded = per_recipient
            .iter()
            .filter(|row| row.outcome.is_sent())
            .count();
        Self {
            total,
            succeeded,
            failed: total - succeeded,
            per_recipient,
        }
    }

    /// Recipients whose message went out, in input order.
    pub fn sent_recipients(&self) -> impl Iterator<Item = &str> {
        self.per_recipient
            .iter()
            .filter(|row| row.outcome.is_sent())
            .map(|row| row.recipient.as_str())
    }

    /// Recipients whose message did not go out, in input order.
    pub fn unsent_recipients(&self) -> impl Iterator<Item = &str> {
        self.per_recipient
            .iter()
            .filter(|row| !row.outcome.is_sent())
            .map(|row| row.recipient.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(recipient: &str, outcome: SendOutcome) -> RecipientOutcome {
        RecipientOutcome {
            recipient: recipient.into(),
            outcome,
        }
    }

    #[test]
    fn totals_reconcile() {
        let result = BatchResult::from_outcomes(vec![
            row("a", SendOutcome::Sent),
            row(
                "b",
                SendOutcome::Rejected {
                    reason: RejectReason::InvalidNumber,
                },
            ),
            row("c", SendOutcome::failed("composer input not found")),
            row("a", SendOutcome::Sent),
        ]);

        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 2);
        assert_eq!(result.succeeded + result.failed, result.total);
        assert_eq!(result.sent_recipients().collect::<Vec<_>>(), ["a", "a"]);
        assert_eq!(result.unsent_recipients().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let sent = serde_json::to_value(SendOutcome::Sent).unwrap();
        assert_eq!(sent["status"], "sent");

        let rejected = serde_json::to_value(SendOutcome::Rejected {
            reason: RejectReason::NotRegistered,
        })
        .unwrap();
        assert_eq!(rejected["status"], "rejected");
        assert_eq!(rejected["reason"], "not_registered");
    }
}
