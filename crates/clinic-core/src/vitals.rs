//! Vitals capture and metabolic derivation.
//!
//! Entry points differ in what they demand: a standard consultation needs a
//! weight, a Siddha intake needs blood pressure plus a naadi or thegi
//! reading. Derived fields are computed when a record is created and
//! recomputed only when a raw metabolic input changes.

use thiserror::Error;

use crate::approval::{Actor, ActorRole};
use crate::db::{Database, DbError};
use crate::metabolic;
use crate::models::{Patient, VitalsInput, VitalsRecord};

/// Vitals capture errors.
#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Patient {0} is not under active treatment")]
    PatientNotActive(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Missing required vital: {0}")]
    MissingRequiredVital(&'static str),

    #[error("Vitals record not found: {0}")]
    RecordNotFound(String),
}

pub type VitalsResult<T> = Result<T, VitalsError>;

/// What an entry point requires before a record is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPolicy {
    require_weight: bool,
    require_blood_pressure: bool,
    require_siddha_assessment: bool,
}

impl EntryPolicy {
    /// Standard consultation: a weight reading is mandatory.
    pub fn standard() -> Self {
        Self {
            require_weight: true,
            require_blood_pressure: false,
            require_siddha_assessment: false,
        }
    }

    /// Siddha intake: blood pressure plus a naadi or thegi observation.
    pub fn siddha_intake() -> Self {
        Self {
            require_weight: false,
            require_blood_pressure: true,
            require_siddha_assessment: true,
        }
    }

    fn check(&self, input: &VitalsInput) -> VitalsResult<()> {
        if self.require_weight && input.weight_kg.is_none() {
            return Err(VitalsError::MissingRequiredVital("weight_kg"));
        }
        if self.require_blood_pressure
            && (input.bp_systolic.is_none() || input.bp_diastolic.is_none())
        {
            return Err(VitalsError::MissingRequiredVital("blood pressure"));
        }
        if self.require_siddha_assessment && input.naadi.is_none() && input.thegi.is_none() {
            return Err(VitalsError::MissingRequiredVital("naadi or thegi"));
        }
        Ok(())
    }
}

/// Records and maintains vitals for active patients.
pub struct VitalsManager<'a> {
    db: &'a Database,
}

impl<'a> VitalsManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a vitals snapshot for an active patient.
    pub fn record(
        &self,
        actor: &Actor,
        patient_id: &str,
        input: &VitalsInput,
        policy: EntryPolicy,
    ) -> VitalsResult<VitalsRecord> {
        let patient = self.load_active_patient(patient_id)?;
        self.require_recorder(actor, &patient)?;
        policy.check(input)?;

        let mut record = VitalsRecord::from_input(patient_id.to_string(), actor.id.clone(), input);
        derive_metabolic(&mut record, &patient);
        self.db.insert_vitals(&record)?;
        Ok(record)
    }

    /// Apply a patch to an existing record. Derived fields are recomputed
    /// only when the patch touches weight or height.
    pub fn update(
        &self,
        actor: &Actor,
        record_id: &str,
        patch: &VitalsInput,
    ) -> VitalsResult<VitalsRecord> {
        let mut record = self
            .db
            .get_vitals(record_id)?
            .ok_or_else(|| VitalsError::RecordNotFound(record_id.to_string()))?;
        let patient = self.load_patient(&record.patient_id)?;
        self.require_recorder(actor, &patient)?;

        apply_patch(&mut record, patch);
        if patch.touches_raw_metabolic_input() {
            derive_metabolic(&mut record, &patient);
        }
        record.updated_at = chrono::Utc::now().to_rfc3339();

        if !self.db.update_vitals(&record)? {
            return Err(VitalsError::RecordNotFound(record_id.to_string()));
        }
        Ok(record)
    }

    /// Most recent snapshot for a patient.
    pub fn latest(&self, patient_id: &str) -> VitalsResult<Option<VitalsRecord>> {
        self.load_patient(patient_id)?;
        Ok(self.db.latest_vitals(patient_id)?)
    }

    /// Full history, newest first.
    pub fn history(&self, patient_id: &str) -> VitalsResult<Vec<VitalsRecord>> {
        self.load_patient(patient_id)?;
        Ok(self.db.vitals_history(patient_id)?)
    }

    fn load_patient(&self, patient_id: &str) -> VitalsResult<Patient> {
        self.db
            .get_patient(patient_id)?
            .ok_or_else(|| VitalsError::PatientNotFound(patient_id.to_string()))
    }

    fn load_active_patient(&self, patient_id: &str) -> VitalsResult<Patient> {
        let patient = self.load_patient(patient_id)?;
        if !patient.is_active() {
            return Err(VitalsError::PatientNotActive(patient_id.to_string()));
        }
        Ok(patient)
    }

    fn require_recorder(&self, actor: &Actor, patient: &Patient) -> VitalsResult<()> {
        match actor.role {
            ActorRole::Admin => Ok(()),
            ActorRole::Doctor if actor.id == patient.assigned_doctor_id => Ok(()),
            _ => Err(VitalsError::Unauthorized(
                "vitals entry needs the admin or the assigned doctor".into(),
            )),
        }
    }
}

/// Fill in bmi, bmr, and tdee from whatever raw inputs the record carries.
/// Missing inputs leave the corresponding field None.
fn derive_metabolic(record: &mut VitalsRecord, patient: &Patient) {
    record.bmi = match (record.weight_kg, record.height_cm) {
        (Some(w), Some(h)) => metabolic::bmi(w, h),
        _ => None,
    };

    let recorded_on = chrono::DateTime::parse_from_rfc3339(&record.recorded_at)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|_| chrono::Utc::now().date_naive());
    let age = patient.profile.personal.age_years_at(recorded_on);

    record.bmr = match (record.weight_kg, age) {
        (Some(weight), Some(age)) => {
            Some(metabolic::bmr(patient.profile.personal.gender, age, weight))
        }
        _ => None,
    };
    record.tdee = record.bmr.map(|bmr| {
        let work_type = metabolic::resolve_work_type(&patient.profile.personal.work_type);
        metabolic::tdee(bmr, patient.profile.personal.gender, work_type)
    });
}

fn apply_patch(record: &mut VitalsRecord, patch: &VitalsInput) {
    if patch.pulse.is_some() {
        record.pulse = patch.pulse;
    }
    if patch.heart_rate.is_some() {
        record.heart_rate = patch.heart_rate;
    }
    if patch.temperature.is_some() {
        record.temperature = patch.temperature;
    }
    if patch.bp_systolic.is_some() {
        record.bp_systolic = patch.bp_systolic;
    }
    if patch.bp_diastolic.is_some() {
        record.bp_diastolic = patch.bp_diastolic;
    }
    if patch.blood_sugar.is_some() {
        record.blood_sugar = patch.blood_sugar;
    }
    if patch.weight_kg.is_some() {
        record.weight_kg = patch.weight_kg;
    }
    if patch.height_cm.is_some() {
        record.height_cm = patch.height_cm;
    }
    if patch.naadi.is_some() {
        record.naadi = patch.naadi.clone();
    }
    if patch.thegi.is_some() {
        record.thegi = patch.thegi.clone();
    }
    if patch.diagnosis.is_some() {
        record.diagnosis = patch.diagnosis.clone();
    }
    if patch.notes.is_some() {
        record.notes = patch.notes.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Doctor, Gender, WorkType};
    use crate::test_fixtures::{sample_doctor_profile, sample_patient_profile};

    fn setup() -> (Database, Doctor, Patient) {
        let db = Database::open_in_memory().unwrap();
        let mut doctor = Doctor::new(sample_doctor_profile());
        doctor.status = ApprovalStatus::Approved;
        db.insert_doctor(&doctor).unwrap();

        let mut patient = Patient::new(sample_patient_profile(), doctor.id.clone());
        patient.status = ApprovalStatus::Approved;
        db.insert_patient(&patient).unwrap();
        (db, doctor, patient)
    }

    fn standard_input() -> VitalsInput {
        VitalsInput {
            weight_kg: Some(68.0),
            height_cm: Some(162.0),
            pulse: Some(74),
            diagnosis: Some("type 2 diabetes".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_derives_metabolic_fields() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);

        let record = manager
            .record(
                &Actor::doctor(&doctor.id),
                &patient.id,
                &standard_input(),
                EntryPolicy::standard(),
            )
            .unwrap();

        // Female, medium work type; age taken at the recording date
        assert_eq!(record.bmi, Some(25.9));
        let age = patient
            .profile
            .personal
            .age_years_at(chrono::Utc::now().date_naive())
            .unwrap();
        let expected_bmr = crate::metabolic::bmr(Gender::Female, age, 68.0);
        assert_eq!(record.bmr, Some(expected_bmr));
        assert_eq!(
            record.tdee,
            Some(crate::metabolic::tdee(expected_bmr, Gender::Female, WorkType::Medium))
        );

        let stored = db.get_vitals(&record.id).unwrap().unwrap();
        assert_eq!(stored.bmr, record.bmr);
    }

    #[test]
    fn test_standard_policy_requires_weight() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);

        let input = VitalsInput {
            pulse: Some(74),
            ..Default::default()
        };
        assert!(matches!(
            manager.record(&Actor::doctor(&doctor.id), &patient.id, &input, EntryPolicy::standard()),
            Err(VitalsError::MissingRequiredVital("weight_kg"))
        ));
    }

    #[test]
    fn test_siddha_intake_policy() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);
        let actor = Actor::doctor(&doctor.id);

        // Blood pressure without an assessment fails
        let input = VitalsInput {
            bp_systolic: Some(120),
            bp_diastolic: Some(80),
            ..Default::default()
        };
        assert!(matches!(
            manager.record(&actor, &patient.id, &input, EntryPolicy::siddha_intake()),
            Err(VitalsError::MissingRequiredVital("naadi or thegi"))
        ));

        // Naadi alone satisfies the assessment requirement; no weight means
        // no derived fields
        let input = VitalsInput {
            bp_systolic: Some(120),
            bp_diastolic: Some(80),
            naadi: Some("vatham".into()),
            ..Default::default()
        };
        let record = manager
            .record(&actor, &patient.id, &input, EntryPolicy::siddha_intake())
            .unwrap();
        assert!(record.bmr.is_none());
        assert!(record.bmi.is_none());
    }

    #[test]
    fn test_inactive_patient_rejected() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);
        let actor = Actor::doctor(&doctor.id);

        db.conn()
            .execute("UPDATE patients SET cured = 1 WHERE id = ?", [&patient.id])
            .unwrap();
        assert!(matches!(
            manager.record(&actor, &patient.id, &standard_input(), EntryPolicy::standard()),
            Err(VitalsError::PatientNotActive(_))
        ));
    }

    #[test]
    fn test_unassigned_doctor_rejected() {
        let (db, _, patient) = setup();
        let manager = VitalsManager::new(&db);

        assert!(matches!(
            manager.record(
                &Actor::doctor("someone-else"),
                &patient.id,
                &standard_input(),
                EntryPolicy::standard()
            ),
            Err(VitalsError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_update_recomputes_only_on_raw_input_change() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);
        let actor = Actor::doctor(&doctor.id);

        let record = manager
            .record(&actor, &patient.id, &standard_input(), EntryPolicy::standard())
            .unwrap();
        let original_bmr = record.bmr;

        // A notes-only patch leaves derived fields alone
        let patch = VitalsInput {
            notes: Some("follow-up in two weeks".into()),
            ..Default::default()
        };
        let updated = manager.update(&actor, &record.id, &patch).unwrap();
        assert_eq!(updated.bmr, original_bmr);
        assert_eq!(updated.notes.as_deref(), Some("follow-up in two weeks"));

        // A weight patch recomputes
        let patch = VitalsInput {
            weight_kg: Some(72.0),
            ..Default::default()
        };
        let updated = manager.update(&actor, &record.id, &patch).unwrap();
        assert_ne!(updated.bmr, original_bmr);
        assert_eq!(updated.bmi, crate::metabolic::bmi(72.0, 162.0));
    }

    #[test]
    fn test_latest_and_history() {
        let (db, doctor, patient) = setup();
        let manager = VitalsManager::new(&db);
        let actor = Actor::doctor(&doctor.id);

        assert!(manager.latest(&patient.id).unwrap().is_none());
        manager
            .record(&actor, &patient.id, &standard_input(), EntryPolicy::standard())
            .unwrap();
        assert!(manager.latest(&patient.id).unwrap().is_some());
        assert_eq!(manager.history(&patient.id).unwrap().len(), 1);

        assert!(matches!(
            manager.latest("no-such-patient"),
            Err(VitalsError::PatientNotFound(_))
        ));
    }
}
