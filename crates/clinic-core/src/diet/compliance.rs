//! Meal self-reporting and compliance computation.

use chrono::NaiveDate;

use super::{DietError, DietResult};
use crate::approval::{Actor, ActorRole};
use crate::db::Database;
use crate::models::DietEntry;

/// Compliance for one calendar day of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCompliance {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub completed: u32,
    pub total: u32,
    /// Whole percentage, 0 when no meals were planned
    pub percentage: u32,
}

impl DailyCompliance {
    fn from_entries(date: String, entries: &[&DietEntry]) -> Self {
        let total = entries.len() as u32;
        let completed = entries.iter().filter(|e| e.completed).count() as u32;
        Self {
            date,
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }
}

/// Whole-number compliance percentage; an empty ledger day scores zero.
fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Records self-reports and computes compliance from the ledger.
pub struct ComplianceTracker<'a> {
    db: &'a Database,
}

impl<'a> ComplianceTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a patient's self-report for one meal slot.
    pub fn report_meal(
        &self,
        actor: &Actor,
        entry_id: &str,
        completed: bool,
    ) -> DietResult<DietEntry> {
        let entry = self
            .db
            .get_diet_entry(entry_id)?
            .ok_or_else(|| DietError::EntryNotFound(entry_id.to_string()))?;
        self.require_reporter(actor, &entry)?;

        self.db.set_meal_completed(entry_id, completed)?;
        self.db
            .get_diet_entry(entry_id)?
            .ok_or_else(|| DietError::EntryNotFound(entry_id.to_string()))
    }

    /// Compliance for a single day.
    pub fn daily(&self, patient_id: &str, date: NaiveDate) -> DietResult<DailyCompliance> {
        self.require_patient(patient_id)?;
        let date = date.format("%Y-%m-%d").to_string();
        let entries = self.db.entries_for_date(patient_id, &date)?;
        let refs: Vec<&DietEntry> = entries.iter().collect();
        Ok(DailyCompliance::from_entries(date, &refs))
    }

    /// Per-day compliance over an inclusive date range. Every day in the
    /// range appears in the result; days with no ledger rows score zero.
    pub fn range(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DietResult<Vec<DailyCompliance>> {
        self.require_patient(patient_id)?;
        let entries = self.db.entries_in_range(
            patient_id,
            &from.format("%Y-%m-%d").to_string(),
            &to.format("%Y-%m-%d").to_string(),
        )?;

        let mut days = Vec::new();
        let mut day = from;
        while day <= to {
            let date = day.format("%Y-%m-%d").to_string();
            let on_day: Vec<&DietEntry> = entries.iter().filter(|e| e.date == date).collect();
            days.push(DailyCompliance::from_entries(date, &on_day));
            day += chrono::Duration::days(1);
        }
        Ok(days)
    }

    /// Overall percentage across a range, weighted by meal count.
    pub fn overall(&self, patient_id: &str, from: NaiveDate, to: NaiveDate) -> DietResult<u32> {
        let days = self.range(patient_id, from, to)?;
        let total: u32 = days.iter().map(|d| d.total).sum();
        let completed: u32 = days.iter().map(|d| d.completed).sum();
        Ok(percentage(completed, total))
    }

    fn require_patient(&self, patient_id: &str) -> DietResult<()> {
        if self.db.get_patient(patient_id)?.is_none() {
            return Err(DietError::PatientNotFound(patient_id.to_string()));
        }
        Ok(())
    }

    fn require_reporter(&self, actor: &Actor, entry: &DietEntry) -> DietResult<()> {
        match actor.role {
            ActorRole::Admin => Ok(()),
            ActorRole::Patient if actor.id == entry.patient_id => Ok(()),
            ActorRole::Doctor => {
                let patient = self
                    .db
                    .get_patient(&entry.patient_id)?
                    .ok_or_else(|| DietError::PatientNotFound(entry.patient_id.clone()))?;
                if actor.id == patient.assigned_doctor_id {
                    Ok(())
                } else {
                    Err(DietError::Unauthorized(
                        "meal reports need the patient, their doctor, or the admin".into(),
                    ))
                }
            }
            _ => Err(DietError::Unauthorized(
                "meal reports need the patient, their doctor, or the admin".into(),
            )),
        }
    }
}
