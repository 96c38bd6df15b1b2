//! Diet template and meal ledger database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{DayPlan, DietEntry, DietTemplate, MealType};

impl Database {
    /// Insert or replace the weekly template for a diagnosis key.
    pub fn upsert_diet_template(&self, template: &DietTemplate) -> DbResult<()> {
        let days_json = serde_json::to_string(&template.days)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO diet_templates (diagnosis_key, days, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT (diagnosis_key) DO UPDATE SET
                days = excluded.days,
                updated_at = excluded.updated_at
            "#,
            params![template.diagnosis_key, days_json, now],
        )?;
        Ok(())
    }

    /// Get the template stored under an exact diagnosis key.
    pub fn get_diet_template(&self, diagnosis_key: &str) -> DbResult<Option<DietTemplate>> {
        let days_json: Option<String> = self
            .conn
            .query_row(
                "SELECT days FROM diet_templates WHERE diagnosis_key = ?",
                [diagnosis_key],
                |row| row.get(0),
            )
            .optional()?;

        match days_json {
            Some(json) => {
                let days: Vec<DayPlan> = serde_json::from_str(&json)?;
                Ok(Some(DietTemplate {
                    diagnosis_key: diagnosis_key.to_string(),
                    days,
                }))
            }
            None => Ok(None),
        }
    }

    /// All stored template keys (for fuzzy resolution).
    pub fn list_template_keys(&self) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT diagnosis_key FROM diet_templates ORDER BY diagnosis_key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Insert a ledger row unless its meal slot is already occupied.
    ///
    /// Returns false when a row for (patient, date, meal type) exists, which
    /// makes plan seeding idempotent.
    pub fn insert_diet_entry(&self, entry: &DietEntry) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO diet_entries (
                id, patient_id, date, meal_type, description, calories,
                completed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.id,
                entry.patient_id,
                entry.date,
                entry.meal_type.as_str(),
                entry.description,
                entry.calories,
                entry.completed,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a ledger row by id.
    pub fn get_diet_entry(&self, id: &str) -> DbResult<Option<DietEntry>> {
        self.conn
            .query_row(
                &format!("{ENTRY_SELECT} WHERE id = ?"),
                [id],
                map_entry_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Record the patient's self-report for a ledger row.
    pub fn set_meal_completed(&self, entry_id: &str, completed: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE diet_entries SET completed = ?2, updated_at = ?3 WHERE id = ?1",
            params![entry_id, completed, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Ledger rows for one patient and calendar date.
    pub fn entries_for_date(&self, patient_id: &str, date: &str) -> DbResult<Vec<DietEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE patient_id = ?1 AND date = ?2 ORDER BY meal_type"
        ))?;
        let rows = stmt.query_map(params![patient_id, date], map_entry_row)?;
        collect_entries(rows)
    }

    /// Ledger rows for one patient over an inclusive date range.
    pub fn entries_in_range(
        &self,
        patient_id: &str,
        from: &str,
        to: &str,
    ) -> DbResult<Vec<DietEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE patient_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date, meal_type"
        ))?;
        let rows = stmt.query_map(params![patient_id, from, to], map_entry_row)?;
        collect_entries(rows)
    }
}

const ENTRY_SELECT: &str = r#"
    SELECT id, patient_id, date, meal_type, description, calories,
           completed, created_at, updated_at
    FROM diet_entries
"#;

struct EntryRow {
    id: String,
    patient_id: String,
    date: String,
    meal_type: String,
    description: Option<String>,
    calories: Option<u32>,
    completed: bool,
    created_at: String,
    updated_at: String,
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        date: row.get(2)?,
        meal_type: row.get(3)?,
        description: row.get(4)?,
        calories: row.get(5)?,
        completed: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<EntryRow>>,
) -> DbResult<Vec<DietEntry>> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.try_into()?);
    }
    Ok(entries)
}

impl TryFrom<EntryRow> for DietEntry {
    type Error = DbError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::parse(&row.meal_type)
            .ok_or_else(|| DbError::Constraint(format!("Unknown meal type: {}", row.meal_type)))?;
        Ok(DietEntry {
            id: row.id,
            patient_id: row.patient_id,
            date: row.date,
            meal_type,
            description: row.description,
            calories: row.calories,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
