//! Invite token issuance.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use super::{EnrollmentError, EnrollmentResult, TOKEN_VALIDITY_HOURS};
use crate::db::Database;
use crate::models::{ApprovalStatus, InviteRole, InviteToken};
use crate::validation::is_well_formed_email;

/// Issues invite tokens against the invite table.
pub struct TokenIssuer<'a> {
    db: &'a Database,
}

impl<'a> TokenIssuer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Issue a doctor invite. Doctor invites come from the admin, never from
    /// another doctor.
    pub fn issue_doctor_invite(
        &self,
        recipient_email: Option<&str>,
    ) -> EnrollmentResult<InviteToken> {
        check_recipient(recipient_email)?;
        let token = build_token(InviteRole::Doctor, None, recipient_email);
        self.db.insert_invite(&token)?;
        Ok(token)
    }

    /// Issue a patient invite on behalf of an approved doctor.
    pub fn issue_patient_invite(
        &self,
        issuing_doctor_id: &str,
        recipient_email: Option<&str>,
    ) -> EnrollmentResult<InviteToken> {
        let doctor = self
            .db
            .get_doctor(issuing_doctor_id)?
            .ok_or_else(|| EnrollmentError::InvalidIssuer(issuing_doctor_id.to_string()))?;
        if doctor.status != ApprovalStatus::Approved {
            return Err(EnrollmentError::InvalidIssuer(format!(
                "doctor {} is not approved",
                issuing_doctor_id
            )));
        }

        check_recipient(recipient_email)?;
        let token = build_token(
            InviteRole::Patient,
            Some(issuing_doctor_id),
            recipient_email,
        );
        self.db.insert_invite(&token)?;
        Ok(token)
    }
}

fn check_recipient(recipient_email: Option<&str>) -> EnrollmentResult<()> {
    match recipient_email {
        Some(email) if !is_well_formed_email(email) => Err(EnrollmentError::Validation(format!(
            "recipient email '{}' is not well formed",
            email
        ))),
        _ => Ok(()),
    }
}

fn build_token(
    role: InviteRole,
    issuing_doctor_id: Option<&str>,
    recipient_email: Option<&str>,
) -> InviteToken {
    let now = Utc::now();
    let issued_at = now.to_rfc3339();

    // Opaque token: hash of a fresh UUID plus the issue instant
    let mut hasher = Sha256::new();
    hasher.update(uuid::Uuid::new_v4().to_string().as_bytes());
    hasher.update(issued_at.as_bytes());
    let token = hex::encode(hasher.finalize());

    InviteToken {
        token,
        role,
        issuing_doctor_id: issuing_doctor_id.map(|s| s.to_string()),
        recipient_email: recipient_email.map(|s| s.to_string()),
        issued_at,
        expires_at: (now + Duration::hours(TOKEN_VALIDITY_HOURS)).to_rfc3339(),
        consumed_at: None,
    }
}
