//! Clinic core: enrollment, approval lifecycle, vitals, and diet tracking
//! for a small multi-doctor practice.
//!
//! The [`ClinicCore`] facade wires the subsystems over one SQLite database
//! and a pluggable notifier. Each subsystem is also usable on its own
//! against a borrowed [`db::Database`].

pub mod approval;
pub mod audit;
pub mod db;
pub mod diet;
pub mod enrollment;
pub mod metabolic;
pub mod models;
pub mod validation;
pub mod vitals;

#[cfg(test)]
pub(crate) mod test_fixtures;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use clinic_notify::{render, NotificationEvent, Notifier, NullNotifier};

use approval::{Actor, ApprovalError, ApprovalStateMachine};
use audit::{AuditChain, AuditError};
use chrono::NaiveDate;
use db::{Database, DbError};
use diet::{ComplianceTracker, DailyCompliance, DietError, TemplateResolver};
use enrollment::{EnrollmentError, RegistrationBinder, TokenIssuer};
use models::{
    ApprovalStatus, AuditEntry, DietEntry, DietTemplate, Doctor, DoctorProfile, EntityKind,
    InviteToken, Patient, PatientProfile, VitalsInput, VitalsRecord,
};
use vitals::{EntryPolicy, VitalsError, VitalsManager};

pub use enrollment::PatientBinding;

// Re-exported so downstream users and integration tests can name the
// notification seam without a separate dependency.
pub use clinic_notify;

/// Top-level error for facade operations.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        if e.is_transient() {
            return ClinicError::Transient(e.to_string());
        }
        match e {
            DbError::NotFound(msg) => ClinicError::NotFound(msg),
            other => ClinicError::Internal(other.to_string()),
        }
    }
}

impl From<EnrollmentError> for ClinicError {
    fn from(e: EnrollmentError) -> Self {
        match e {
            EnrollmentError::Database(db) => db.into(),
            EnrollmentError::Validation(msg) => ClinicError::Validation(msg),
            EnrollmentError::TokenNotFound => ClinicError::NotFound(e.to_string()),
            EnrollmentError::DoctorNotFound(_) => ClinicError::NotFound(e.to_string()),
            EnrollmentError::TokenAlreadyConsumed | EnrollmentError::TokenExpired => {
                ClinicError::Conflict(e.to_string())
            }
            EnrollmentError::TokenRoleMismatch { .. } => ClinicError::Validation(e.to_string()),
            EnrollmentError::InvalidIssuer(msg) => ClinicError::Unauthorized(msg),
        }
    }
}

impl From<ApprovalError> for ClinicError {
    fn from(e: ApprovalError) -> Self {
        match e {
            ApprovalError::Database(db) => db.into(),
            ApprovalError::NotFound(kind, id) => ClinicError::NotFound(format!("{} {}", kind, id)),
            ApprovalError::Unauthorized(msg) => ClinicError::Unauthorized(msg),
            ApprovalError::InvalidTransition { .. } => ClinicError::Conflict(e.to_string()),
            ApprovalError::ReasonRequired => ClinicError::Validation(e.to_string()),
        }
    }
}

impl From<VitalsError> for ClinicError {
    fn from(e: VitalsError) -> Self {
        match e {
            VitalsError::Database(db) => db.into(),
            VitalsError::PatientNotFound(_) | VitalsError::RecordNotFound(_) => {
                ClinicError::NotFound(e.to_string())
            }
            VitalsError::PatientNotActive(_) => ClinicError::Conflict(e.to_string()),
            VitalsError::Unauthorized(msg) => ClinicError::Unauthorized(msg),
            VitalsError::MissingRequiredVital(_) => ClinicError::Validation(e.to_string()),
        }
    }
}

impl From<DietError> for ClinicError {
    fn from(e: DietError) -> Self {
        match e {
            DietError::Database(db) => db.into(),
            DietError::PatientNotFound(_)
            | DietError::TemplateNotFound(_)
            | DietError::EntryNotFound(_) => ClinicError::NotFound(e.to_string()),
            DietError::PatientNotActive(_) => ClinicError::Conflict(e.to_string()),
            DietError::NoDiagnosis(_) => ClinicError::Validation(e.to_string()),
            DietError::Unauthorized(msg) => ClinicError::Unauthorized(msg),
        }
    }
}

impl From<AuditError> for ClinicError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Database(db) => db.into(),
            AuditError::ChainBroken { .. } => ClinicError::Internal(e.to_string()),
        }
    }
}

const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Run an operation, retrying transient storage errors with a short linear
/// backoff.
fn with_retry<T>(mut op: impl FnMut() -> ClinicResult<T>) -> ClinicResult<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Err(ClinicError::Transient(msg)) if attempt < MAX_RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %msg, "transient storage error, retrying");
                std::thread::sleep(Duration::from_millis(50 * attempt as u64));
            }
            other => return other,
        }
    }
}

/// Facade over the whole clinic core.
pub struct ClinicCore {
    db: Database,
    notifier: Box<dyn Notifier>,
}

impl ClinicCore {
    /// Open (or create) a clinic database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, notifier: Box<dyn Notifier>) -> ClinicResult<Self> {
        let db = Database::open(path)?;
        Ok(Self { db, notifier })
    }

    /// In-memory clinic with no outbound notifications, for tests and tools.
    pub fn open_in_memory() -> ClinicResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            notifier: Box::new(NullNotifier),
        })
    }

    /// In-memory clinic with a caller-supplied notifier.
    pub fn open_in_memory_with(notifier: Box<dyn Notifier>) -> ClinicResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db, notifier })
    }

    // ------------------------------------------------------------------
    // Enrollment
    // ------------------------------------------------------------------

    /// Issue a doctor invite (admin action). The recipient, when known, gets
    /// the token by notification.
    pub fn issue_doctor_invite(&self, recipient_email: Option<&str>) -> ClinicResult<InviteToken> {
        let token = with_retry(|| {
            Ok(TokenIssuer::new(&self.db).issue_doctor_invite(recipient_email)?)
        })?;
        self.send_invite(&token);
        Ok(token)
    }

    /// Issue a patient invite on behalf of an approved doctor.
    pub fn issue_patient_invite(
        &self,
        issuing_doctor_id: &str,
        recipient_email: Option<&str>,
    ) -> ClinicResult<InviteToken> {
        let token = with_retry(|| {
            Ok(TokenIssuer::new(&self.db).issue_patient_invite(issuing_doctor_id, recipient_email)?)
        })?;
        self.send_invite(&token);
        Ok(token)
    }

    /// Register a doctor against an invite token. The new record is pending
    /// admin approval.
    pub fn register_doctor(&self, token: &str, profile: DoctorProfile) -> ClinicResult<Doctor> {
        let doctor = with_retry(|| {
            Ok(RegistrationBinder::new(&self.db).bind_doctor(token, profile.clone())?)
        })?;
        self.notify(
            &doctor.email,
            NotificationEvent::RegistrationReceived {
                name: doctor.full_name(),
                role: "doctor".into(),
            },
        );
        Ok(doctor)
    }

    /// Register a patient, bound to a doctor by invite or by public id.
    pub fn register_patient(
        &self,
        binding: PatientBinding,
        profile: PatientProfile,
    ) -> ClinicResult<Patient> {
        let patient = with_retry(|| {
            Ok(RegistrationBinder::new(&self.db).bind_patient(binding.clone(), profile.clone())?)
        })?;
        self.notify(
            &patient.email,
            NotificationEvent::RegistrationReceived {
                name: patient.profile.personal.full_name(),
                role: "patient".into(),
            },
        );
        Ok(patient)
    }

    // ------------------------------------------------------------------
    // Approval lifecycle
    // ------------------------------------------------------------------

    pub fn approve_doctor(&self, actor: &Actor, doctor_id: &str) -> ClinicResult<Doctor> {
        with_retry(|| Ok(self.machine().approve_doctor(actor, doctor_id)?))
    }

    pub fn reject_doctor(
        &self,
        actor: &Actor,
        doctor_id: &str,
        reason: &str,
    ) -> ClinicResult<Doctor> {
        with_retry(|| Ok(self.machine().reject_doctor(actor, doctor_id, reason)?))
    }

    pub fn revert_doctor(
        &self,
        actor: &Actor,
        doctor_id: &str,
        target: ApprovalStatus,
        reason: Option<&str>,
    ) -> ClinicResult<Doctor> {
        with_retry(|| Ok(self.machine().revert_doctor(actor, doctor_id, target, reason)?))
    }

    pub fn approve_patient(&self, actor: &Actor, patient_id: &str) -> ClinicResult<Patient> {
        with_retry(|| Ok(self.machine().approve_patient(actor, patient_id)?))
    }

    pub fn reject_patient(
        &self,
        actor: &Actor,
        patient_id: &str,
        reason: &str,
    ) -> ClinicResult<Patient> {
        with_retry(|| Ok(self.machine().reject_patient(actor, patient_id, reason)?))
    }

    pub fn revert_patient(
        &self,
        actor: &Actor,
        patient_id: &str,
        target: ApprovalStatus,
        reason: Option<&str>,
    ) -> ClinicResult<Patient> {
        with_retry(|| Ok(self.machine().revert_patient(actor, patient_id, target, reason)?))
    }

    pub fn mark_patient_cured(&self, actor: &Actor, patient_id: &str) -> ClinicResult<Patient> {
        with_retry(|| Ok(self.machine().mark_patient_cured(actor, patient_id)?))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn doctor(&self, doctor_id: &str) -> ClinicResult<Option<Doctor>> {
        Ok(self.db.get_doctor(doctor_id)?)
    }

    pub fn patient(&self, patient_id: &str) -> ClinicResult<Option<Patient>> {
        Ok(self.db.get_patient(patient_id)?)
    }

    pub fn doctor_by_public_id(&self, public_id: &str) -> ClinicResult<Option<Doctor>> {
        Ok(self.db.get_doctor_by_public_id(public_id)?)
    }

    pub fn patient_by_public_id(&self, public_id: &str) -> ClinicResult<Option<Patient>> {
        Ok(self.db.get_patient_by_public_id(public_id)?)
    }

    /// Doctors awaiting admin review, oldest first.
    pub fn pending_doctors(&self) -> ClinicResult<Vec<Doctor>> {
        Ok(self.db.list_doctors_by_status(ApprovalStatus::Pending)?)
    }

    /// Patients awaiting review, oldest first.
    pub fn pending_patients(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self.db.list_patients_by_status(ApprovalStatus::Pending)?)
    }

    pub fn patients_for_doctor(&self, doctor_id: &str) -> ClinicResult<Vec<Patient>> {
        Ok(self.db.list_patients_for_doctor(doctor_id)?)
    }

    // ------------------------------------------------------------------
    // Vitals
    // ------------------------------------------------------------------

    pub fn record_vitals(
        &self,
        actor: &Actor,
        patient_id: &str,
        input: &VitalsInput,
        policy: EntryPolicy,
    ) -> ClinicResult<VitalsRecord> {
        with_retry(|| {
            Ok(VitalsManager::new(&self.db).record(actor, patient_id, input, policy)?)
        })
    }

    pub fn update_vitals(
        &self,
        actor: &Actor,
        record_id: &str,
        patch: &VitalsInput,
    ) -> ClinicResult<VitalsRecord> {
        with_retry(|| Ok(VitalsManager::new(&self.db).update(actor, record_id, patch)?))
    }

    pub fn latest_vitals(&self, patient_id: &str) -> ClinicResult<Option<VitalsRecord>> {
        Ok(VitalsManager::new(&self.db).latest(patient_id)?)
    }

    pub fn vitals_history(&self, patient_id: &str) -> ClinicResult<Vec<VitalsRecord>> {
        Ok(VitalsManager::new(&self.db).history(patient_id)?)
    }

    // ------------------------------------------------------------------
    // Diet
    // ------------------------------------------------------------------

    /// Create or replace the weekly template for a diagnosis.
    pub fn define_diet_template(&self, template: &DietTemplate) -> ClinicResult<()> {
        with_retry(|| Ok(self.db.upsert_diet_template(template)?))
    }

    /// Seed a week of the meal ledger from the patient's latest diagnosis.
    pub fn assign_diet_week(
        &self,
        patient_id: &str,
        week_start: NaiveDate,
    ) -> ClinicResult<Vec<DietEntry>> {
        with_retry(|| Ok(TemplateResolver::new(&self.db).assign_week(patient_id, week_start)?))
    }

    /// Seed a week from an explicitly named template.
    pub fn assign_diet_week_with_template(
        &self,
        patient_id: &str,
        diagnosis_key: &str,
        week_start: NaiveDate,
    ) -> ClinicResult<Vec<DietEntry>> {
        with_retry(|| {
            Ok(TemplateResolver::new(&self.db).assign_week_with_template(
                patient_id,
                diagnosis_key,
                week_start,
            )?)
        })
    }

    /// Record a meal self-report.
    pub fn report_meal(
        &self,
        actor: &Actor,
        entry_id: &str,
        completed: bool,
    ) -> ClinicResult<DietEntry> {
        with_retry(|| Ok(ComplianceTracker::new(&self.db).report_meal(actor, entry_id, completed)?))
    }

    pub fn daily_compliance(
        &self,
        patient_id: &str,
        date: NaiveDate,
    ) -> ClinicResult<DailyCompliance> {
        Ok(ComplianceTracker::new(&self.db).daily(patient_id, date)?)
    }

    pub fn compliance_range(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClinicResult<Vec<DailyCompliance>> {
        Ok(ComplianceTracker::new(&self.db).range(patient_id, from, to)?)
    }

    pub fn overall_compliance(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClinicResult<u32> {
        Ok(ComplianceTracker::new(&self.db).overall(patient_id, from, to)?)
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Lifecycle trail for one entity, oldest first.
    pub fn audit_trail(&self, kind: EntityKind, entity_id: &str) -> ClinicResult<Vec<AuditEntry>> {
        Ok(AuditChain::new(&self.db).for_entity(kind, entity_id)?)
    }

    /// Verify the integrity of the whole audit log.
    pub fn verify_audit_log(&self) -> ClinicResult<()> {
        Ok(AuditChain::new(&self.db).verify()?)
    }

    fn machine(&self) -> ApprovalStateMachine<'_> {
        ApprovalStateMachine::new(&self.db, self.notifier.as_ref())
    }

    fn send_invite(&self, token: &InviteToken) {
        let Some(recipient) = token.recipient_email.as_deref() else {
            return;
        };
        self.notify(
            recipient,
            NotificationEvent::InviteIssued {
                role: token.role.as_str().into(),
                token: token.token.clone(),
                expires_at: token.expires_at.clone(),
            },
        );
    }

    fn notify(&self, recipient: &str, event: NotificationEvent) {
        let notification = render(&event, recipient);
        if let Err(e) = self.notifier.notify(notification) {
            tracing::warn!(error = %e, recipient, "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        assert!(ClinicCore::open_in_memory().is_ok());
    }

    #[test]
    fn test_transient_maps_through_error_chain() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err: ClinicError = DbError::Sqlite(busy).into();
        assert!(matches!(err, ClinicError::Transient(_)));

        let err: ClinicError = DbError::NotFound("doctor d-1".into()).into();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[test]
    fn test_with_retry_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: ClinicResult<()> = with_retry(|| {
            calls += 1;
            Err(ClinicError::Transient("busy".into()))
        });
        assert!(matches!(result, Err(ClinicError::Transient(_))));
        assert_eq!(calls, MAX_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_with_retry_recovers() {
        let mut calls = 0;
        let result = with_retry(|| {
            calls += 1;
            if calls < 2 {
                Err(ClinicError::Transient("locked".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_non_transient_not_retried() {
        let mut calls = 0;
        let result: ClinicResult<()> = with_retry(|| {
            calls += 1;
            Err(ClinicError::Validation("bad email".into()))
        });
        assert!(matches!(result, Err(ClinicError::Validation(_))));
        assert_eq!(calls, 1);
    }
}
