//! Doctor and patient models.
//!
//! Doctors and patients share the same approval state shape; their structured
//! profiles differ. Profiles are stored as JSON in the database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Approval state shared by doctors and patients.
///
/// Transitions happen only through the approval state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Parse the canonical name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

/// Gender, as used by the metabolic coefficient tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Activity band derived from a patient's occupation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Soft,
    Medium,
    Heavy,
}

impl WorkType {
    /// Parse a work-type label, accepting the common synonyms that appear in
    /// occupation records.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "soft" | "sedentary" | "light" => Some(WorkType::Soft),
            "medium" | "moderate" => Some(WorkType::Medium),
            "heavy" | "hard" => Some(WorkType::Heavy),
            _ => None,
        }
    }
}

/// Doctor profile: personal, professional, and practice sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProfile {
    pub personal: DoctorPersonal,
    pub professional: ProfessionalInfo,
    pub practice: PracticeInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorPersonal {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfessionalInfo {
    pub qualification: String,
    pub registration_number: String,
    pub specialty: Option<String>,
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeInfo {
    pub clinic_name: String,
    pub address: Option<String>,
    pub consultation_hours: Option<String>,
}

/// Patient profile: personal, address, and emergency-contact sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    pub personal: PatientPersonal,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientPersonal {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Date of birth, `YYYY-MM-DD`
    pub date_of_birth: String,
    pub gender: Gender,
    /// Activity band label; unrecognized values fall back to the soft band
    pub work_type: String,
    pub occupation: Option<String>,
}

impl PatientPersonal {
    /// Whole years of age on the given date, when the date of birth parses.
    pub fn age_years_at(&self, on: NaiveDate) -> Option<u32> {
        let dob = NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").ok()?;
        if dob > on {
            return Some(0);
        }
        let mut age = on.years_since(dob)?;
        // years_since is already birthday-aware; clamp for safety on same-day
        if age > 150 {
            age = 150;
        }
        Some(age)
    }

    /// Display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

/// A doctor record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Internal UUID
    pub id: String,
    /// Stable public identifier, assigned on first approval and immutable
    pub public_id: Option<String>,
    /// Contact email (mirrors the profile for query convenience)
    pub email: String,
    pub profile: DoctorProfile,
    pub status: ApprovalStatus,
    /// Reason recorded on the most recent rejection
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Doctor {
    /// Create a new doctor awaiting admin approval.
    pub fn new(profile: DoctorProfile) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            public_id: None,
            email: profile.personal.email.clone(),
            profile,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.profile.personal.first_name, self.profile.personal.last_name
        )
    }
}

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Internal UUID
    pub id: String,
    /// Stable public identifier, assigned on first approval and immutable
    pub public_id: Option<String>,
    /// Contact email (mirrors the profile for query convenience)
    pub email: String,
    pub profile: PatientProfile,
    pub status: ApprovalStatus,
    /// Reason recorded on the most recent rejection
    pub rejection_reason: Option<String>,
    /// Treatment closed out; orthogonal to approval status
    pub cured: bool,
    /// Set at registration, never changed automatically
    pub assigned_doctor_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient awaiting review by the assigned doctor.
    pub fn new(profile: PatientProfile, assigned_doctor_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            public_id: None,
            email: profile.personal.email.clone(),
            profile,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            cured: false,
            assigned_doctor_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Approved and still under treatment.
    pub fn is_active(&self) -> bool {
        self.status == ApprovalStatus::Approved && !self.cured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{sample_doctor_profile, sample_patient_profile};

    #[test]
    fn test_new_doctor_is_pending() {
        let doctor = Doctor::new(sample_doctor_profile());
        assert_eq!(doctor.status, ApprovalStatus::Pending);
        assert!(doctor.public_id.is_none());
        assert_eq!(doctor.email, "meena.raghavan@example.org");
        assert_eq!(doctor.id.len(), 36);
    }

    #[test]
    fn test_new_patient_is_pending_and_bound_to_doctor() {
        let patient = Patient::new(sample_patient_profile(), "doc-1".into());
        assert_eq!(patient.status, ApprovalStatus::Pending);
        assert_eq!(patient.assigned_doctor_id, "doc-1");
        assert!(!patient.cured);
        assert!(!patient.is_active());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse("cured"), None);
    }

    #[test]
    fn test_age_years_at() {
        let profile = sample_patient_profile();
        let on = NaiveDate::from_ymd_opt(2026, 4, 11).unwrap();
        assert_eq!(profile.personal.age_years_at(on), Some(35));
        let on_birthday = NaiveDate::from_ymd_opt(2026, 4, 12).unwrap();
        assert_eq!(profile.personal.age_years_at(on_birthday), Some(36));
    }

    #[test]
    fn test_age_with_bad_dob() {
        let mut profile = sample_patient_profile();
        profile.personal.date_of_birth = "12/04/1990".into();
        let on = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(profile.personal.age_years_at(on), None);
    }

    #[test]
    fn test_work_type_synonyms() {
        assert_eq!(WorkType::parse("Sedentary"), Some(WorkType::Soft));
        assert_eq!(WorkType::parse("moderate"), Some(WorkType::Medium));
        assert_eq!(WorkType::parse("heavy"), Some(WorkType::Heavy));
        assert_eq!(WorkType::parse("astronaut"), None);
    }
}
