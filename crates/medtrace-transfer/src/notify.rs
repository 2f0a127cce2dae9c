//! Outbound notification seam.
//!
//! Delivery (SMS, KakaoTalk, email) is an external collaborator. The
//! services build a [`Notification`] and hand it to the configured
//! [`NotificationSink`] strictly *after* a successful commit; a sink
//! failure is logged and swallowed, never rolled back into the
//! transfer.

use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use medtrace_core::ActionKind;

/// Delivery failure reported by a sink.
#[derive(Debug, Clone, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// One outbound notification.
///
/// `recipient` is a patient contact (phone) for patient-facing events
/// and an organization name for organization-facing ones; resolving a
/// name to an actual channel is the dispatcher's concern.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The ledger action that triggered the notification.
    pub event: ActionKind,
    /// Who to reach.
    pub recipient: String,
    /// Dispatcher-defined payload.
    pub payload: Value,
}

/// Where notifications go after a commit.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    fn dispatch(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Discards everything. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn dispatch(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Records everything. For tests and local inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for RecordingSink {
    fn dispatch(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
