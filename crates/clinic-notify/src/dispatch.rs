//! Notification dispatch seam and test doubles.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Notification errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notification has no recipient address")]
    MissingRecipient,
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Recipient email address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Delivery seam. Implementations own the transport.
///
/// Callers treat dispatch as best-effort: a `NotifyError` must never roll
/// back the state change that triggered the notification.
pub trait Notifier: Send + Sync {
    /// Deliver a single notification.
    fn notify(&self, notification: Notification) -> NotifyResult<()>;
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, notification: Notification) -> NotifyResult<()> {
        (**self).notify(notification)
    }
}

/// Discards every notification. Useful when no transport is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) -> NotifyResult<()> {
        Ok(())
    }
}

/// Records notifications in memory for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of notifications delivered.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> NotifyResult<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
        Ok(())
    }
}

/// Always fails. Exercises best-effort dispatch paths in tests.
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notification: Notification) -> NotifyResult<()> {
        Err(NotifyError::Delivery("transport unavailable".into()))
    }
}
