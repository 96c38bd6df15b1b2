//! Message templates for lifecycle events.
//!
//! Templates render to plain text. The core never formats user-facing
//! messages itself; it hands an event to [`render`] and dispatches the
//! result through a [`crate::Notifier`].

use serde::{Deserialize, Serialize};

use crate::Notification;

/// A lifecycle event worth telling somebody about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NotificationEvent {
    /// An invite token was issued.
    InviteIssued {
        role: String,
        token: String,
        expires_at: String,
    },
    /// A registration was received and queued for review.
    RegistrationReceived { name: String, role: String },
    /// The subject was approved and given a public identifier.
    Approved { name: String, public_id: String },
    /// The subject was rejected, with the reviewer's reason.
    Rejected { name: String, reason: String },
    /// An earlier decision was administratively reverted.
    Reverted {
        name: String,
        new_status: String,
        reason: Option<String>,
    },
    /// A patient's treatment was closed out as cured.
    MarkedCured { name: String },
}

/// Render an event into a deliverable notification.
pub fn render(event: &NotificationEvent, recipient: &str) -> Notification {
    let (subject, body) = match event {
        NotificationEvent::InviteIssued {
            role,
            token,
            expires_at,
        } => (
            format!("Your {} registration invite", role),
            format!(
                "You have been invited to register as a {}.\n\n\
                 Registration token: {}\n\
                 This token is single-use and expires at {}.",
                role, token, expires_at
            ),
        ),
        NotificationEvent::RegistrationReceived { name, role } => (
            "Registration received".to_string(),
            format!(
                "Hello {},\n\nYour {} registration has been received and is \
                 awaiting review. You will be notified once a decision is made.",
                name, role
            ),
        ),
        NotificationEvent::Approved { name, public_id } => (
            "Registration approved".to_string(),
            format!(
                "Hello {},\n\nYour registration has been approved. \
                 Your identifier is {}.",
                name, public_id
            ),
        ),
        NotificationEvent::Rejected { name, reason } => (
            "Registration decision".to_string(),
            format!(
                "Hello {},\n\nYour registration was not approved.\nReason: {}",
                name, reason
            ),
        ),
        NotificationEvent::Reverted {
            name,
            new_status,
            reason,
        } => (
            "Account status updated".to_string(),
            match reason {
                Some(r) => format!(
                    "Hello {},\n\nYour account status has been changed to {}.\nReason: {}",
                    name, new_status, r
                ),
                None => format!(
                    "Hello {},\n\nYour account status has been changed to {}.",
                    name, new_status
                ),
            },
        ),
        NotificationEvent::MarkedCured { name } => (
            "Treatment completed".to_string(),
            format!(
                "Hello {},\n\nYour treating doctor has marked your treatment \
                 as completed. Your records remain available.",
                name
            ),
        ),
    };

    Notification {
        recipient: recipient.to_string(),
        subject,
        body,
    }
}
