//! Vitals record database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::VitalsRecord;

impl Database {
    /// Insert a vitals record.
    pub fn insert_vitals(&self, record: &VitalsRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO vitals_records (
                id, patient_id, recorded_by, recorded_at,
                pulse, heart_rate, temperature, bp_systolic, bp_diastolic,
                blood_sugar, weight_kg, height_cm, naadi, thegi, diagnosis,
                bmi, bmr, tdee, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
            )
            "#,
            params![
                record.id,
                record.patient_id,
                record.recorded_by,
                record.recorded_at,
                record.pulse,
                record.heart_rate,
                record.temperature,
                record.bp_systolic,
                record.bp_diastolic,
                record.blood_sugar,
                record.weight_kg,
                record.height_cm,
                record.naadi,
                record.thegi,
                record.diagnosis,
                record.bmi,
                record.bmr,
                record.tdee,
                record.notes,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite a record's mutable fields.
    pub fn update_vitals(&self, record: &VitalsRecord) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE vitals_records SET
                pulse = ?2, heart_rate = ?3, temperature = ?4,
                bp_systolic = ?5, bp_diastolic = ?6, blood_sugar = ?7,
                weight_kg = ?8, height_cm = ?9, naadi = ?10, thegi = ?11,
                diagnosis = ?12, bmi = ?13, bmr = ?14, tdee = ?15,
                notes = ?16, updated_at = ?17
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.pulse,
                record.heart_rate,
                record.temperature,
                record.bp_systolic,
                record.bp_diastolic,
                record.blood_sugar,
                record.weight_kg,
                record.height_cm,
                record.naadi,
                record.thegi,
                record.diagnosis,
                record.bmi,
                record.bmr,
                record.tdee,
                record.notes,
                record.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a vitals record by id.
    pub fn get_vitals(&self, id: &str) -> DbResult<Option<VitalsRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{VITALS_SELECT} WHERE id = ?"),
                [id],
                map_vitals_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recent vitals record for a patient.
    pub fn latest_vitals(&self, patient_id: &str) -> DbResult<Option<VitalsRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "{VITALS_SELECT} WHERE patient_id = ? ORDER BY recorded_at DESC LIMIT 1"
                ),
                [patient_id],
                map_vitals_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Full vitals history for a patient, newest first.
    pub fn vitals_history(&self, patient_id: &str) -> DbResult<Vec<VitalsRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VITALS_SELECT} WHERE patient_id = ? ORDER BY recorded_at DESC"
        ))?;
        let rows = stmt.query_map([patient_id], map_vitals_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

const VITALS_SELECT: &str = r#"
    SELECT id, patient_id, recorded_by, recorded_at,
           pulse, heart_rate, temperature, bp_systolic, bp_diastolic,
           blood_sugar, weight_kg, height_cm, naadi, thegi, diagnosis,
           bmi, bmr, tdee, notes, created_at, updated_at
    FROM vitals_records
"#;

fn map_vitals_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VitalsRecord> {
    Ok(VitalsRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        recorded_by: row.get(2)?,
        recorded_at: row.get(3)?,
        pulse: row.get(4)?,
        heart_rate: row.get(5)?,
        temperature: row.get(6)?,
        bp_systolic: row.get(7)?,
        bp_diastolic: row.get(8)?,
        blood_sugar: row.get(9)?,
        weight_kg: row.get(10)?,
        height_cm: row.get(11)?,
        naadi: row.get(12)?,
        thegi: row.get(13)?,
        diagnosis: row.get(14)?,
        bmi: row.get(15)?,
        bmr: row.get(16)?,
        tdee: row.get(17)?,
        notes: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}
