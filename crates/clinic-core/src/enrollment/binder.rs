//! Registration binding: turning a submitted profile into a pending record.

use chrono::Utc;

use super::{EnrollmentError, EnrollmentResult};
use crate::db::Database;
use crate::models::{ApprovalStatus, Doctor, DoctorProfile, InviteRole, InviteToken, Patient, PatientProfile};
use crate::validation::{describe_issues, validate_doctor_profile, validate_patient_profile};

/// How a patient registration names its doctor.
#[derive(Debug, Clone)]
pub enum PatientBinding {
    /// Invite token issued by the doctor; the token decides the assignment.
    Invite(String),
    /// Direct registration against a doctor's public identifier.
    DoctorPublicId(String),
}

/// Binds registrations to invite tokens and inserts pending records.
pub struct RegistrationBinder<'a> {
    db: &'a Database,
}

impl<'a> RegistrationBinder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a doctor against an admin-issued invite token.
    ///
    /// The token consume and the insert commit together; losing a race for
    /// the token surfaces as `TokenAlreadyConsumed` with nothing written.
    pub fn bind_doctor(&self, token: &str, profile: DoctorProfile) -> EnrollmentResult<Doctor> {
        let issues = validate_doctor_profile(&profile);
        if !issues.is_empty() {
            return Err(EnrollmentError::Validation(describe_issues(&issues)));
        }

        let invite = self.load_live_invite(token, InviteRole::Doctor)?;
        let doctor = Doctor::new(profile);
        let now = Utc::now().to_rfc3339();
        if !self
            .db
            .consume_and_insert_doctor(&invite.token, &now, &doctor)?
        {
            return Err(EnrollmentError::TokenAlreadyConsumed);
        }
        Ok(doctor)
    }

    /// Register a patient, bound to a doctor by invite or by public id.
    pub fn bind_patient(
        &self,
        binding: PatientBinding,
        profile: PatientProfile,
    ) -> EnrollmentResult<Patient> {
        let issues = validate_patient_profile(&profile);
        if !issues.is_empty() {
            return Err(EnrollmentError::Validation(describe_issues(&issues)));
        }

        match binding {
            PatientBinding::Invite(token) => {
                let invite = self.load_live_invite(&token, InviteRole::Patient)?;
                let doctor_id = invite.issuing_doctor_id.clone().ok_or_else(|| {
                    EnrollmentError::InvalidIssuer("patient invite has no issuing doctor".into())
                })?;

                let patient = Patient::new(profile, doctor_id);
                let now = Utc::now().to_rfc3339();
                if !self
                    .db
                    .consume_and_insert_patient(&invite.token, &now, &patient)?
                {
                    return Err(EnrollmentError::TokenAlreadyConsumed);
                }
                Ok(patient)
            }
            PatientBinding::DoctorPublicId(public_id) => {
                let doctor = self
                    .db
                    .get_doctor_by_public_id(&public_id)?
                    .filter(|d| d.status == ApprovalStatus::Approved)
                    .ok_or_else(|| EnrollmentError::DoctorNotFound(public_id.clone()))?;

                let patient = Patient::new(profile, doctor.id);
                self.db.insert_patient(&patient)?;
                Ok(patient)
            }
        }
    }

    fn load_live_invite(&self, token: &str, expected: InviteRole) -> EnrollmentResult<InviteToken> {
        let invite = self
            .db
            .get_invite(token)?
            .ok_or(EnrollmentError::TokenNotFound)?;
        if invite.role != expected {
            return Err(EnrollmentError::TokenRoleMismatch {
                expected: invite.role.as_str(),
            });
        }
        if invite.is_consumed() {
            return Err(EnrollmentError::TokenAlreadyConsumed);
        }
        if invite.is_expired_at(Utc::now()) {
            return Err(EnrollmentError::TokenExpired);
        }
        Ok(invite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::TokenIssuer;
    use crate::test_fixtures::{sample_doctor_profile, sample_patient_profile};
    use chrono::Duration;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn approved_doctor(db: &Database) -> Doctor {
        let mut doctor = Doctor::new(sample_doctor_profile());
        doctor.status = ApprovalStatus::Approved;
        doctor.public_id = Some("DOC-1A2B3C4D".into());
        db.insert_doctor(&doctor).unwrap();
        doctor
    }

    #[test]
    fn test_bind_doctor_consumes_token() {
        let db = setup_db();
        let token = TokenIssuer::new(&db).issue_doctor_invite(None).unwrap();
        let binder = RegistrationBinder::new(&db);

        let doctor = binder
            .bind_doctor(&token.token, sample_doctor_profile())
            .unwrap();
        assert_eq!(doctor.status, ApprovalStatus::Pending);
        assert!(db.get_doctor(&doctor.id).unwrap().is_some());
        assert!(db.get_invite(&token.token).unwrap().unwrap().is_consumed());
    }

    #[test]
    fn test_token_is_single_use() {
        let db = setup_db();
        let token = TokenIssuer::new(&db).issue_doctor_invite(None).unwrap();
        let binder = RegistrationBinder::new(&db);

        binder
            .bind_doctor(&token.token, sample_doctor_profile())
            .unwrap();
        assert!(matches!(
            binder.bind_doctor(&token.token, sample_doctor_profile()),
            Err(EnrollmentError::TokenAlreadyConsumed)
        ));
    }

    #[test]
    fn test_unknown_and_expired_tokens_rejected() {
        let db = setup_db();
        let binder = RegistrationBinder::new(&db);

        assert!(matches!(
            binder.bind_doctor("no-such-token", sample_doctor_profile()),
            Err(EnrollmentError::TokenNotFound)
        ));

        let mut stale = TokenIssuer::new(&db).issue_doctor_invite(None).unwrap();
        stale.expires_at = (Utc::now() - Duration::hours(1)).to_rfc3339();
        db.conn()
            .execute(
                "UPDATE invite_tokens SET expires_at = ?2 WHERE token = ?1",
                rusqlite::params![stale.token, stale.expires_at],
            )
            .unwrap();
        assert!(matches!(
            binder.bind_doctor(&stale.token, sample_doctor_profile()),
            Err(EnrollmentError::TokenExpired)
        ));
    }

    #[test]
    fn test_role_mismatch_rejected() {
        let db = setup_db();
        let doctor = approved_doctor(&db);
        let patient_token = TokenIssuer::new(&db)
            .issue_patient_invite(&doctor.id, None)
            .unwrap();
        let binder = RegistrationBinder::new(&db);

        assert!(matches!(
            binder.bind_doctor(&patient_token.token, sample_doctor_profile()),
            Err(EnrollmentError::TokenRoleMismatch { .. })
        ));
    }

    #[test]
    fn test_validation_failure_leaves_token_live() {
        let db = setup_db();
        let token = TokenIssuer::new(&db).issue_doctor_invite(None).unwrap();
        let binder = RegistrationBinder::new(&db);

        let mut profile = sample_doctor_profile();
        profile.personal.email = "not-an-email".into();
        assert!(matches!(
            binder.bind_doctor(&token.token, profile),
            Err(EnrollmentError::Validation(_))
        ));

        // Failed registration must not burn the invite
        assert!(!db.get_invite(&token.token).unwrap().unwrap().is_consumed());
        let good = binder
            .bind_doctor(&token.token, sample_doctor_profile())
            .unwrap();
        assert!(db.get_doctor(&good.id).unwrap().is_some());
    }

    #[test]
    fn test_bind_patient_via_invite_assigns_issuer() {
        let db = setup_db();
        let doctor = approved_doctor(&db);
        let token = TokenIssuer::new(&db)
            .issue_patient_invite(&doctor.id, None)
            .unwrap();
        let binder = RegistrationBinder::new(&db);

        let patient = binder
            .bind_patient(
                PatientBinding::Invite(token.token.clone()),
                sample_patient_profile(),
            )
            .unwrap();
        assert_eq!(patient.assigned_doctor_id, doctor.id);
        assert_eq!(patient.status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_bind_patient_via_public_id() {
        let db = setup_db();
        let doctor = approved_doctor(&db);
        let binder = RegistrationBinder::new(&db);

        let patient = binder
            .bind_patient(
                PatientBinding::DoctorPublicId("DOC-1A2B3C4D".into()),
                sample_patient_profile(),
            )
            .unwrap();
        assert_eq!(patient.assigned_doctor_id, doctor.id);

        assert!(matches!(
            binder.bind_patient(
                PatientBinding::DoctorPublicId("DOC-MISSING".into()),
                sample_patient_profile(),
            ),
            Err(EnrollmentError::DoctorNotFound(_))
        ));
    }

    #[test]
    fn test_bind_patient_rejects_unapproved_doctor_public_id() {
        let db = setup_db();
        let mut doctor = Doctor::new(sample_doctor_profile());
        doctor.public_id = Some("DOC-99999999".into());
        doctor.status = ApprovalStatus::Rejected;
        db.insert_doctor(&doctor).unwrap();
        let binder = RegistrationBinder::new(&db);

        assert!(matches!(
            binder.bind_patient(
                PatientBinding::DoctorPublicId("DOC-99999999".into()),
                sample_patient_profile(),
            ),
            Err(EnrollmentError::DoctorNotFound(_))
        ));
    }
}
