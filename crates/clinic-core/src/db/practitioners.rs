//! Doctor and patient database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{ApprovalStatus, AuditEntry, Doctor, DoctorProfile, Patient, PatientProfile};

impl Database {
    /// Insert a new doctor.
    pub fn insert_doctor(&self, doctor: &Doctor) -> DbResult<()> {
        insert_doctor_sql(&self.conn, doctor)
    }

    /// Get a doctor by internal id.
    pub fn get_doctor(&self, id: &str) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("{DOCTOR_SELECT} WHERE id = ?"),
                [id],
                map_doctor_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a doctor by public identifier.
    pub fn get_doctor_by_public_id(&self, public_id: &str) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("{DOCTOR_SELECT} WHERE public_id = ?"),
                [public_id],
                map_doctor_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List doctors in a given approval state, oldest first (review queue order).
    pub fn list_doctors_by_status(&self, status: ApprovalStatus) -> DbResult<Vec<Doctor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCTOR_SELECT} WHERE status = ? ORDER BY created_at"))?;
        let rows = stmt.query_map([status.as_str()], map_doctor_row)?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?.try_into()?);
        }
        Ok(doctors)
    }

    /// Apply a doctor status change and its audit entry atomically.
    pub fn transition_doctor(&self, doctor: &Doctor, audit: &AuditEntry) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE doctors SET
                public_id = ?2,
                status = ?3,
                rejection_reason = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                doctor.id,
                doctor.public_id,
                doctor.status.as_str(),
                doctor.rejection_reason,
                doctor.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("doctor {}", doctor.id)));
        }
        super::audit::append_audit_sql(&tx, audit)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        insert_patient_sql(&self.conn, patient)
    }

    /// Get a patient by internal id.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{PATIENT_SELECT} WHERE id = ?"),
                [id],
                map_patient_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a patient by public identifier.
    pub fn get_patient_by_public_id(&self, public_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{PATIENT_SELECT} WHERE public_id = ?"),
                [public_id],
                map_patient_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List patients in a given approval state, oldest first.
    pub fn list_patients_by_status(&self, status: ApprovalStatus) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PATIENT_SELECT} WHERE status = ? ORDER BY created_at"))?;
        let rows = stmt.query_map([status.as_str()], map_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// List patients assigned to a doctor.
    pub fn list_patients_for_doctor(&self, doctor_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PATIENT_SELECT} WHERE assigned_doctor_id = ? ORDER BY created_at"
        ))?;
        let rows = stmt.query_map([doctor_id], map_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Apply a patient status/cured change and its audit entry atomically.
    pub fn transition_patient(&self, patient: &Patient, audit: &AuditEntry) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE patients SET
                public_id = ?2,
                status = ?3,
                rejection_reason = ?4,
                cured = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.public_id,
                patient.status.as_str(),
                patient.rejection_reason,
                patient.cured,
                patient.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {}", patient.id)));
        }
        super::audit::append_audit_sql(&tx, audit)?;
        tx.commit()?;
        Ok(())
    }
}

const DOCTOR_SELECT: &str = r#"
    SELECT id, public_id, email, profile, status, rejection_reason,
           created_at, updated_at
    FROM doctors
"#;

const PATIENT_SELECT: &str = r#"
    SELECT id, public_id, email, profile, status, rejection_reason,
           cured, assigned_doctor_id, created_at, updated_at
    FROM patients
"#;

pub(crate) fn insert_doctor_sql(conn: &Connection, doctor: &Doctor) -> DbResult<()> {
    let profile_json = serde_json::to_string(&doctor.profile)?;
    conn.execute(
        r#"
        INSERT INTO doctors (
            id, public_id, email, profile, status, rejection_reason,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            doctor.id,
            doctor.public_id,
            doctor.email,
            profile_json,
            doctor.status.as_str(),
            doctor.rejection_reason,
            doctor.created_at,
            doctor.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_patient_sql(conn: &Connection, patient: &Patient) -> DbResult<()> {
    let profile_json = serde_json::to_string(&patient.profile)?;
    conn.execute(
        r#"
        INSERT INTO patients (
            id, public_id, email, profile, status, rejection_reason,
            cured, assigned_doctor_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            patient.id,
            patient.public_id,
            patient.email,
            profile_json,
            patient.status.as_str(),
            patient.rejection_reason,
            patient.cured,
            patient.assigned_doctor_id,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(())
}

struct DoctorRow {
    id: String,
    public_id: Option<String>,
    email: String,
    profile: String,
    status: String,
    rejection_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_doctor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorRow> {
    Ok(DoctorRow {
        id: row.get(0)?,
        public_id: row.get(1)?,
        email: row.get(2)?,
        profile: row.get(3)?,
        status: row.get(4)?,
        rejection_reason: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = DbError;

    fn try_from(row: DoctorRow) -> Result<Self, Self::Error> {
        let profile: DoctorProfile = serde_json::from_str(&row.profile)?;
        let status = parse_status(&row.status)?;
        Ok(Doctor {
            id: row.id,
            public_id: row.public_id,
            email: row.email,
            profile,
            status,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct PatientRow {
    id: String,
    public_id: Option<String>,
    email: String,
    profile: String,
    status: String,
    rejection_reason: Option<String>,
    cured: bool,
    assigned_doctor_id: String,
    created_at: String,
    updated_at: String,
}

fn map_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        public_id: row.get(1)?,
        email: row.get(2)?,
        profile: row.get(3)?,
        status: row.get(4)?,
        rejection_reason: row.get(5)?,
        cured: row.get(6)?,
        assigned_doctor_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let profile: PatientProfile = serde_json::from_str(&row.profile)?;
        let status = parse_status(&row.status)?;
        Ok(Patient {
            id: row.id,
            public_id: row.public_id,
            email: row.email,
            profile,
            status,
            rejection_reason: row.rejection_reason,
            cured: row.cured,
            assigned_doctor_id: row.assigned_doctor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(s: &str) -> Result<ApprovalStatus, DbError> {
    ApprovalStatus::parse(s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown approval status: {}", s)))
}
