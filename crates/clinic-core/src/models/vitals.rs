//! Vitals record models.

use serde::{Deserialize, Serialize};

/// A timestamped vitals snapshot for a patient.
///
/// Derived fields (bmi, bmr, tdee) are filled in on create/update when their
/// raw inputs are present, then stored verbatim; reads never recompute them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalsRecord {
    pub id: String,
    pub patient_id: String,
    /// Doctor who recorded the snapshot
    pub recorded_by: String,
    /// Recording timestamp (RFC 3339); newest-first ordering defines "latest"
    pub recorded_at: String,

    // Raw vitals
    pub pulse: Option<i64>,
    pub heart_rate: Option<i64>,
    pub temperature: Option<f64>,
    pub bp_systolic: Option<i64>,
    pub bp_diastolic: Option<i64>,
    pub blood_sugar: Option<f64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,

    // Siddha assessment
    pub naadi: Option<String>,
    pub thegi: Option<String>,

    pub diagnosis: Option<String>,

    // Derived metabolic fields
    pub bmi: Option<f64>,
    pub bmr: Option<f64>,
    pub tdee: Option<f64>,

    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VitalsRecord {
    /// Create a record from raw input fields; derived fields are whatever the
    /// input carried (usually nothing) until the manager fills them in.
    pub fn from_input(patient_id: String, recorded_by: String, input: &VitalsInput) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            recorded_by,
            recorded_at: now.clone(),
            pulse: input.pulse,
            heart_rate: input.heart_rate,
            temperature: input.temperature,
            bp_systolic: input.bp_systolic,
            bp_diastolic: input.bp_diastolic,
            blood_sugar: input.blood_sugar,
            weight_kg: input.weight_kg,
            height_cm: input.height_cm,
            naadi: input.naadi.clone(),
            thegi: input.thegi.clone(),
            diagnosis: input.diagnosis.clone(),
            bmi: input.bmi,
            bmr: input.bmr,
            tdee: input.tdee,
            notes: input.notes.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether blood pressure was recorded (both numbers).
    pub fn has_blood_pressure(&self) -> bool {
        self.bp_systolic.is_some() && self.bp_diastolic.is_some()
    }

    /// Whether a Siddha assessment (naadi or thegi) was recorded.
    pub fn has_siddha_assessment(&self) -> bool {
        self.naadi.is_some() || self.thegi.is_some()
    }
}

/// Raw fields submitted at a vitals entry point; also used as an update patch
/// (Some overwrites, None leaves the stored value alone).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalsInput {
    pub pulse: Option<i64>,
    pub heart_rate: Option<i64>,
    pub temperature: Option<f64>,
    pub bp_systolic: Option<i64>,
    pub bp_diastolic: Option<i64>,
    pub blood_sugar: Option<f64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub naadi: Option<String>,
    pub thegi: Option<String>,
    pub diagnosis: Option<String>,
    pub bmi: Option<f64>,
    pub bmr: Option<f64>,
    pub tdee: Option<f64>,
    pub notes: Option<String>,
}

impl VitalsInput {
    /// Whether the patch touches a raw input that derived fields depend on.
    pub fn touches_raw_metabolic_input(&self) -> bool {
        self.weight_kg.is_some() || self.height_cm.is_some()
    }
}
