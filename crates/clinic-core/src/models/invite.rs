//! Invite token model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role an invite token grants registration for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteRole {
    Doctor,
    Patient,
}

impl InviteRole {
    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteRole::Doctor => "doctor",
            InviteRole::Patient => "patient",
        }
    }

    /// Parse the canonical name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doctor" => Some(InviteRole::Doctor),
            "patient" => Some(InviteRole::Patient),
            _ => None,
        }
    }
}

/// A time-bounded, single-use registration credential.
///
/// Tokens are consumed exactly once and never deleted; consumed and expired
/// tokens stay on record for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InviteToken {
    /// Opaque unique token string
    pub token: String,
    /// Role the token grants
    pub role: InviteRole,
    /// Issuing doctor, for doctor-initiated patient invites
    pub issuing_doctor_id: Option<String>,
    /// Intended recipient, when known at issue time
    pub recipient_email: Option<String>,
    /// Issue timestamp (RFC 3339)
    pub issued_at: String,
    /// Expiry timestamp (RFC 3339)
    pub expires_at: String,
    /// Consumption timestamp; None while the token is still live
    pub consumed_at: Option<String>,
}

impl InviteToken {
    /// Whether the token has already been bound to a registration.
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Whether the token is past its expiry at the given instant.
    ///
    /// An unparseable expiry counts as expired rather than live.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expiry) => now >= expiry.with_timezone(&Utc),
            Err(_) => true,
        }
    }
}
