//! Approval lifecycle state machine for doctors and patients.
//!
//! Every transition commits together with its audit entry. Notifications go
//! out after commit and are best-effort: a failed delivery is logged and
//! never rolls the transition back.

use thiserror::Error;

use clinic_notify::{render, NotificationEvent, Notifier};

use crate::audit::AuditChain;
use crate::db::{Database, DbError};
use crate::models::{ApprovalStatus, Doctor, EntityKind, Patient};

/// Approval lifecycle errors.
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("A rejection reason is required")]
    ReasonRequired,
}

pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Who is requesting a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Admin,
    Doctor,
    Patient,
}

impl Actor {
    pub fn admin(id: &str) -> Self {
        Self { id: id.to_string(), role: ActorRole::Admin }
    }

    pub fn doctor(id: &str) -> Self {
        Self { id: id.to_string(), role: ActorRole::Doctor }
    }

    pub fn patient(id: &str) -> Self {
        Self { id: id.to_string(), role: ActorRole::Patient }
    }
}

/// Runs lifecycle transitions against the database.
pub struct ApprovalStateMachine<'a> {
    db: &'a Database,
    notifier: &'a dyn Notifier,
}

impl<'a> ApprovalStateMachine<'a> {
    pub fn new(db: &'a Database, notifier: &'a dyn Notifier) -> Self {
        Self { db, notifier }
    }

    /// Approve a pending doctor. Approving an already-approved doctor is a
    /// no-op that returns the stored record untouched.
    pub fn approve_doctor(&self, actor: &Actor, doctor_id: &str) -> ApprovalResult<Doctor> {
        self.require_admin(actor)?;
        let mut doctor = self.load_doctor(doctor_id)?;

        match doctor.status {
            ApprovalStatus::Approved => return Ok(doctor),
            ApprovalStatus::Pending => {}
            ApprovalStatus::Rejected => {
                return Err(ApprovalError::InvalidTransition { from: "rejected", to: "approved" })
            }
        }

        self.enter_doctor_status(&mut doctor, ApprovalStatus::Approved, actor, None)?;
        self.notify(
            &doctor.email,
            NotificationEvent::Approved {
                name: doctor.full_name(),
                public_id: doctor.public_id.clone().unwrap_or_default(),
            },
        );
        Ok(doctor)
    }

    /// Reject a doctor with a reason. Allowed from pending (the initial
    /// decision) and from approved (an administrative override).
    pub fn reject_doctor(
        &self,
        actor: &Actor,
        doctor_id: &str,
        reason: &str,
    ) -> ApprovalResult<Doctor> {
        self.require_admin(actor)?;
        let reason = non_empty_reason(reason)?;
        let mut doctor = self.load_doctor(doctor_id)?;

        if doctor.status == ApprovalStatus::Rejected {
            return Err(ApprovalError::InvalidTransition {
                from: "rejected",
                to: "rejected",
            });
        }

        self.enter_doctor_status(&mut doctor, ApprovalStatus::Rejected, actor, Some(reason))?;
        self.notify(
            &doctor.email,
            NotificationEvent::Rejected {
                name: doctor.full_name(),
                reason: reason.to_string(),
            },
        );
        Ok(doctor)
    }

    /// Revert a doctor decision. Allowed corrections: approved to rejected,
    /// rejected to approved, rejected back to pending.
    pub fn revert_doctor(
        &self,
        actor: &Actor,
        doctor_id: &str,
        target: ApprovalStatus,
        reason: Option<&str>,
    ) -> ApprovalResult<Doctor> {
        self.require_admin(actor)?;
        let mut doctor = self.load_doctor(doctor_id)?;
        check_revert(doctor.status, target)?;

        self.enter_doctor_status(&mut doctor, target, actor, reason)?;
        self.notify(
            &doctor.email,
            NotificationEvent::Reverted {
                name: doctor.full_name(),
                new_status: target.as_str().to_string(),
                reason: reason.map(|r| r.to_string()),
            },
        );
        Ok(doctor)
    }

    /// Approve a pending patient. Idempotent when already approved.
    pub fn approve_patient(&self, actor: &Actor, patient_id: &str) -> ApprovalResult<Patient> {
        let mut patient = self.load_patient(patient_id)?;
        self.require_admin_or_assigned(actor, &patient)?;

        match patient.status {
            ApprovalStatus::Approved => return Ok(patient),
            ApprovalStatus::Pending => {}
            ApprovalStatus::Rejected => {
                return Err(ApprovalError::InvalidTransition { from: "rejected", to: "approved" })
            }
        }

        self.enter_patient_status(&mut patient, ApprovalStatus::Approved, actor, None)?;
        self.notify(
            &patient.email,
            NotificationEvent::Approved {
                name: patient.profile.personal.full_name(),
                public_id: patient.public_id.clone().unwrap_or_default(),
            },
        );
        Ok(patient)
    }

    /// Reject a patient with a reason. Allowed from pending and, as an
    /// override, from approved.
    pub fn reject_patient(
        &self,
        actor: &Actor,
        patient_id: &str,
        reason: &str,
    ) -> ApprovalResult<Patient> {
        let reason = non_empty_reason(reason)?;
        let mut patient = self.load_patient(patient_id)?;
        self.require_admin_or_assigned(actor, &patient)?;

        if patient.status == ApprovalStatus::Rejected {
            return Err(ApprovalError::InvalidTransition {
                from: "rejected",
                to: "rejected",
            });
        }

        self.enter_patient_status(&mut patient, ApprovalStatus::Rejected, actor, Some(reason))?;
        self.notify(
            &patient.email,
            NotificationEvent::Rejected {
                name: patient.profile.personal.full_name(),
                reason: reason.to_string(),
            },
        );
        Ok(patient)
    }

    /// Revert a patient decision, same correction set as for doctors.
    pub fn revert_patient(
        &self,
        actor: &Actor,
        patient_id: &str,
        target: ApprovalStatus,
        reason: Option<&str>,
    ) -> ApprovalResult<Patient> {
        let mut patient = self.load_patient(patient_id)?;
        self.require_admin_or_assigned(actor, &patient)?;
        check_revert(patient.status, target)?;

        self.enter_patient_status(&mut patient, target, actor, reason)?;
        self.notify(
            &patient.email,
            NotificationEvent::Reverted {
                name: patient.profile.personal.full_name(),
                new_status: target.as_str().to_string(),
                reason: reason.map(|r| r.to_string()),
            },
        );
        Ok(patient)
    }

    /// Close out an approved patient's treatment.
    pub fn mark_patient_cured(&self, actor: &Actor, patient_id: &str) -> ApprovalResult<Patient> {
        let mut patient = self.load_patient(patient_id)?;
        self.require_admin_or_assigned(actor, &patient)?;

        if patient.status != ApprovalStatus::Approved {
            return Err(ApprovalError::InvalidTransition {
                from: patient.status.as_str(),
                to: "cured",
            });
        }
        if patient.cured {
            return Ok(patient);
        }

        patient.cured = true;
        patient.updated_at = chrono::Utc::now().to_rfc3339();
        let audit = AuditChain::new(self.db).prepare(
            EntityKind::Patient,
            &patient.id,
            "approved",
            "cured",
            &actor.id,
            None,
        )?;
        self.db.transition_patient(&patient, &audit)?;

        self.notify(
            &patient.email,
            NotificationEvent::MarkedCured {
                name: patient.profile.personal.full_name(),
            },
        );
        Ok(patient)
    }

    fn enter_doctor_status(
        &self,
        doctor: &mut Doctor,
        target: ApprovalStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> ApprovalResult<()> {
        let from = doctor.status.as_str();
        doctor.status = target;
        doctor.updated_at = chrono::Utc::now().to_rfc3339();
        match target {
            ApprovalStatus::Approved => {
                // Public id is assigned once, on first approval, and kept
                // across later reverts
                if doctor.public_id.is_none() {
                    doctor.public_id = Some(public_id("DOC", &doctor.id));
                }
                doctor.rejection_reason = None;
            }
            ApprovalStatus::Rejected => {
                doctor.rejection_reason = reason.map(|r| r.to_string());
            }
            ApprovalStatus::Pending => {
                doctor.rejection_reason = None;
            }
        }

        let audit = AuditChain::new(self.db).prepare(
            EntityKind::Doctor,
            &doctor.id,
            from,
            target.as_str(),
            &actor.id,
            reason,
        )?;
        self.db.transition_doctor(doctor, &audit)?;
        Ok(())
    }

    fn enter_patient_status(
        &self,
        patient: &mut Patient,
        target: ApprovalStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> ApprovalResult<()> {
        let from = patient.status.as_str();
        patient.status = target;
        patient.updated_at = chrono::Utc::now().to_rfc3339();
        match target {
            ApprovalStatus::Approved => {
                if patient.public_id.is_none() {
                    patient.public_id = Some(public_id("PAT", &patient.id));
                }
                patient.rejection_reason = None;
            }
            ApprovalStatus::Rejected => {
                patient.rejection_reason = reason.map(|r| r.to_string());
            }
            ApprovalStatus::Pending => {
                patient.rejection_reason = None;
            }
        }

        let audit = AuditChain::new(self.db).prepare(
            EntityKind::Patient,
            &patient.id,
            from,
            target.as_str(),
            &actor.id,
            reason,
        )?;
        self.db.transition_patient(patient, &audit)?;
        Ok(())
    }

    fn load_doctor(&self, id: &str) -> ApprovalResult<Doctor> {
        self.db
            .get_doctor(id)?
            .ok_or_else(|| ApprovalError::NotFound("doctor", id.to_string()))
    }

    fn load_patient(&self, id: &str) -> ApprovalResult<Patient> {
        self.db
            .get_patient(id)?
            .ok_or_else(|| ApprovalError::NotFound("patient", id.to_string()))
    }

    fn require_admin(&self, actor: &Actor) -> ApprovalResult<()> {
        if actor.role != ActorRole::Admin {
            return Err(ApprovalError::Unauthorized(
                "doctor lifecycle decisions are admin-only".into(),
            ));
        }
        Ok(())
    }

    fn require_admin_or_assigned(&self, actor: &Actor, patient: &Patient) -> ApprovalResult<()> {
        match actor.role {
            ActorRole::Admin => Ok(()),
            ActorRole::Doctor if actor.id == patient.assigned_doctor_id => Ok(()),
            _ => Err(ApprovalError::Unauthorized(
                "patient lifecycle decisions need the admin or the assigned doctor".into(),
            )),
        }
    }

    fn notify(&self, recipient: &str, event: NotificationEvent) {
        let notification = render(&event, recipient);
        if let Err(e) = self.notifier.notify(notification) {
            tracing::warn!(error = %e, recipient, "notification delivery failed");
        }
    }
}

/// Stable public identifier: prefix plus eight uppercase hex chars taken
/// from the internal UUID.
fn public_id(prefix: &str, internal_id: &str) -> String {
    let hex: String = internal_id
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(8)
        .collect();
    format!("{}-{}", prefix, hex.to_uppercase())
}

fn check_revert(from: ApprovalStatus, to: ApprovalStatus) -> ApprovalResult<()> {
    let allowed = matches!(
        (from, to),
        (ApprovalStatus::Approved, ApprovalStatus::Rejected)
            | (ApprovalStatus::Rejected, ApprovalStatus::Approved)
            | (ApprovalStatus::Rejected, ApprovalStatus::Pending)
    );
    if allowed {
        Ok(())
    } else {
        Err(ApprovalError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

fn non_empty_reason(reason: &str) -> ApprovalResult<&str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ApprovalError::ReasonRequired);
    }
    Ok(trimmed)
}
