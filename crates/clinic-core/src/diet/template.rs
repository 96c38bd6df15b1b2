//! Diet template resolution and plan assignment.

use chrono::{Duration, NaiveDate};
use strsim::jaro_winkler;

use super::{DietError, DietResult, TEMPLATE_MATCH_THRESHOLD};
use crate::db::Database;
use crate::models::{normalize_diagnosis, DietEntry, DietTemplate, IsoWeekday, Patient};

/// Resolves diagnosis text to stored templates and seeds the meal ledger.
pub struct TemplateResolver<'a> {
    db: &'a Database,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find the template for a diagnosis: exact key match first, then the
    /// closest fuzzy match above the similarity threshold.
    pub fn resolve(&self, diagnosis: &str) -> DietResult<DietTemplate> {
        let key = normalize_diagnosis(diagnosis);
        if let Some(template) = self.db.get_diet_template(&key)? {
            return Ok(template);
        }

        let mut best: Option<(f64, String)> = None;
        for candidate in self.db.list_template_keys()? {
            let score = jaro_winkler(&key, &candidate);
            if score >= TEMPLATE_MATCH_THRESHOLD
                && best.as_ref().map_or(true, |(s, _)| score > *s)
            {
                best = Some((score, candidate));
            }
        }

        match best {
            Some((score, candidate)) => {
                tracing::debug!(diagnosis = %key, template = %candidate, score, "fuzzy template match");
                self.db
                    .get_diet_template(&candidate)?
                    .ok_or_else(|| DietError::TemplateNotFound(key))
            }
            None => Err(DietError::TemplateNotFound(key)),
        }
    }

    /// Seed one week of ledger rows for a patient, starting at `week_start`.
    ///
    /// The diagnosis comes from the patient's latest vitals record. Seeding
    /// is idempotent: slots that already have a row are left untouched, and
    /// only freshly created rows are returned.
    pub fn assign_week(
        &self,
        patient_id: &str,
        week_start: NaiveDate,
    ) -> DietResult<Vec<DietEntry>> {
        let patient = self.load_active_patient(patient_id)?;

        let diagnosis = self
            .db
            .latest_vitals(&patient.id)?
            .and_then(|v| v.diagnosis)
            .ok_or_else(|| DietError::NoDiagnosis(patient_id.to_string()))?;
        let template = self.resolve(&diagnosis)?;

        self.seed_week(&patient, &template, week_start)
    }

    /// Seed a week from an explicitly chosen template, bypassing diagnosis
    /// lookup. Used when the doctor overrides the match.
    pub fn assign_week_with_template(
        &self,
        patient_id: &str,
        diagnosis_key: &str,
        week_start: NaiveDate,
    ) -> DietResult<Vec<DietEntry>> {
        let patient = self.load_active_patient(patient_id)?;
        let template = self.resolve(diagnosis_key)?;
        self.seed_week(&patient, &template, week_start)
    }

    fn seed_week(
        &self,
        patient: &Patient,
        template: &DietTemplate,
        week_start: NaiveDate,
    ) -> DietResult<Vec<DietEntry>> {
        let mut created = Vec::new();
        for offset in 0..7 {
            let date = week_start + Duration::days(offset);
            let weekday = IsoWeekday::from_date(date);
            let Some(plan) = template.plan_for(weekday) else {
                continue;
            };
            for meal in &plan.meals {
                let entry = DietEntry::new(patient.id.clone(), date, meal);
                if self.db.insert_diet_entry(&entry)? {
                    created.push(entry);
                }
            }
        }
        Ok(created)
    }

    fn load_active_patient(&self, patient_id: &str) -> DietResult<Patient> {
        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or_else(|| DietError::PatientNotFound(patient_id.to_string()))?;
        if !patient.is_active() {
            return Err(DietError::PatientNotActive(patient_id.to_string()));
        }
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ApprovalStatus, DayPlan, Doctor, MealType, PlannedMeal, VitalsInput, VitalsRecord,
    };
    use crate::test_fixtures::{sample_doctor_profile, sample_patient_profile};

    fn setup() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let mut doctor = Doctor::new(sample_doctor_profile());
        doctor.status = ApprovalStatus::Approved;
        db.insert_doctor(&doctor).unwrap();

        let mut patient = Patient::new(sample_patient_profile(), doctor.id.clone());
        patient.status = ApprovalStatus::Approved;
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn full_week_template(key: &str) -> DietTemplate {
        let days = [
            IsoWeekday::Monday,
            IsoWeekday::Tuesday,
            IsoWeekday::Wednesday,
            IsoWeekday::Thursday,
            IsoWeekday::Friday,
            IsoWeekday::Saturday,
            IsoWeekday::Sunday,
        ]
        .into_iter()
        .map(|weekday| DayPlan {
            weekday,
            meals: vec![
                PlannedMeal {
                    meal_type: MealType::Breakfast,
                    description: "ragi porridge".into(),
                    calories: Some(280),
                },
                PlannedMeal {
                    meal_type: MealType::Lunch,
                    description: "millet with greens".into(),
                    calories: Some(520),
                },
            ],
        })
        .collect();
        DietTemplate::new(key, days)
    }

    fn record_diagnosis(db: &Database, patient: &Patient, diagnosis: &str) {
        let record = VitalsRecord::from_input(
            patient.id.clone(),
            patient.assigned_doctor_id.clone(),
            &VitalsInput {
                weight_kg: Some(68.0),
                diagnosis: Some(diagnosis.into()),
                ..Default::default()
            },
        );
        db.insert_vitals(&record).unwrap();
    }

    #[test]
    fn test_exact_resolution() {
        let (db, _) = setup();
        db.upsert_diet_template(&full_week_template("type 2 diabetes"))
            .unwrap();
        let resolver = TemplateResolver::new(&db);

        let template = resolver.resolve("  Type 2 Diabetes ").unwrap();
        assert_eq!(template.diagnosis_key, "type 2 diabetes");
    }

    #[test]
    fn test_fuzzy_resolution_picks_closest() {
        let (db, _) = setup();
        db.upsert_diet_template(&full_week_template("type 2 diabetes"))
            .unwrap();
        db.upsert_diet_template(&full_week_template("hypertension"))
            .unwrap();
        let resolver = TemplateResolver::new(&db);

        // Misspelling still lands on the diabetes template
        let template = resolver.resolve("type 2 diabetis").unwrap();
        assert_eq!(template.diagnosis_key, "type 2 diabetes");

        assert!(matches!(
            resolver.resolve("chronic migraine"),
            Err(DietError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_assign_week_seeds_ledger() {
        let (db, patient) = setup();
        db.upsert_diet_template(&full_week_template("type 2 diabetes"))
            .unwrap();
        record_diagnosis(&db, &patient, "type 2 diabetes");
        let resolver = TemplateResolver::new(&db);

        let monday = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let created = resolver.assign_week(&patient.id, monday).unwrap();
        // 7 days, 2 meals each
        assert_eq!(created.len(), 14);
        assert_eq!(created[0].date, "2026-08-31");

        // Re-assigning the same week creates nothing new
        let again = resolver.assign_week(&patient.id, monday).unwrap();
        assert!(again.is_empty());
        assert_eq!(
            db.entries_in_range(&patient.id, "2026-08-31", "2026-09-06")
                .unwrap()
                .len(),
            14
        );
    }

    #[test]
    fn test_assign_week_requires_diagnosis() {
        let (db, patient) = setup();
        db.upsert_diet_template(&full_week_template("type 2 diabetes"))
            .unwrap();
        let resolver = TemplateResolver::new(&db);

        let monday = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert!(matches!(
            resolver.assign_week(&patient.id, monday),
            Err(DietError::NoDiagnosis(_))
        ));
    }

    #[test]
    fn test_assign_week_requires_active_patient() {
        let (db, patient) = setup();
        db.conn()
            .execute("UPDATE patients SET cured = 1 WHERE id = ?", [&patient.id])
            .unwrap();
        let resolver = TemplateResolver::new(&db);

        let monday = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert!(matches!(
            resolver.assign_week(&patient.id, monday),
            Err(DietError::PatientNotActive(_))
        ));
    }

    #[test]
    fn test_partial_template_skips_unplanned_days() {
        let (db, patient) = setup();
        let template = DietTemplate::new(
            "anaemia",
            vec![DayPlan {
                weekday: IsoWeekday::Wednesday,
                meals: vec![PlannedMeal {
                    meal_type: MealType::Dinner,
                    description: "spinach dal".into(),
                    calories: Some(400),
                }],
            }],
        );
        db.upsert_diet_template(&template).unwrap();
        let resolver = TemplateResolver::new(&db);

        let monday = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let created = resolver
            .assign_week_with_template(&patient.id, "anaemia", monday)
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].date, "2026-09-02");
    }
}
