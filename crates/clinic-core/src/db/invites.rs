//! Invite token database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Doctor, InviteRole, InviteToken, Patient};

impl Database {
    /// Insert a freshly issued token.
    pub fn insert_invite(&self, token: &InviteToken) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO invite_tokens (
                token, role, issuing_doctor_id, recipient_email,
                issued_at, expires_at, consumed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                token.token,
                token.role.as_str(),
                token.issuing_doctor_id,
                token.recipient_email,
                token.issued_at,
                token.expires_at,
                token.consumed_at,
            ],
        )?;
        Ok(())
    }

    /// Get a token by its opaque string.
    pub fn get_invite(&self, token: &str) -> DbResult<Option<InviteToken>> {
        self.conn
            .query_row(
                r#"
                SELECT token, role, issuing_doctor_id, recipient_email,
                       issued_at, expires_at, consumed_at
                FROM invite_tokens
                WHERE token = ?
                "#,
                [token],
                map_invite_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Consume a token and insert the doctor it binds, atomically.
    ///
    /// Returns false (and writes nothing) when the consume loses the race.
    pub fn consume_and_insert_doctor(
        &self,
        token: &str,
        consumed_at: &str,
        doctor: &Doctor,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        if !consume_invite_sql(&tx, token, consumed_at)? {
            return Ok(false);
        }
        super::practitioners::insert_doctor_sql(&tx, doctor)?;
        tx.commit()?;
        Ok(true)
    }

    /// Consume a token and insert the patient it binds, atomically.
    pub fn consume_and_insert_patient(
        &self,
        token: &str,
        consumed_at: &str,
        patient: &Patient,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        if !consume_invite_sql(&tx, token, consumed_at)? {
            return Ok(false);
        }
        super::practitioners::insert_patient_sql(&tx, patient)?;
        tx.commit()?;
        Ok(true)
    }
}

/// Mark a token consumed, only if it is still unconsumed.
///
/// Returns false when the token was already consumed; under two racing
/// binds exactly one caller sees true. Runs against the caller's
/// connection or transaction so the consume commits with the bind.
pub(crate) fn consume_invite_sql(
    conn: &Connection,
    token: &str,
    consumed_at: &str,
) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE invite_tokens SET consumed_at = ?2 WHERE token = ?1 AND consumed_at IS NULL",
        params![token, consumed_at],
    )?;
    Ok(rows_affected > 0)
}

struct InviteRow {
    token: String,
    role: String,
    issuing_doctor_id: Option<String>,
    recipient_email: Option<String>,
    issued_at: String,
    expires_at: String,
    consumed_at: Option<String>,
}

fn map_invite_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        token: row.get(0)?,
        role: row.get(1)?,
        issuing_doctor_id: row.get(2)?,
        recipient_email: row.get(3)?,
        issued_at: row.get(4)?,
        expires_at: row.get(5)?,
        consumed_at: row.get(6)?,
    })
}

impl TryFrom<InviteRow> for InviteToken {
    type Error = DbError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        let role = InviteRole::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown invite role: {}", row.role)))?;
        Ok(InviteToken {
            token: row.token,
            role,
            issuing_doctor_id: row.issuing_doctor_id,
            recipient_email: row.recipient_email,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            consumed_at: row.consumed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_token(token: &str) -> InviteToken {
        let now = Utc::now();
        InviteToken {
            token: token.into(),
            role: InviteRole::Doctor,
            issuing_doctor_id: None,
            recipient_email: Some("new.doctor@example.org".into()),
            issued_at: now.to_rfc3339(),
            expires_at: (now + Duration::hours(72)).to_rfc3339(),
            consumed_at: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let token = make_token("tok-1");
        db.insert_invite(&token).unwrap();

        let retrieved = db.get_invite("tok-1").unwrap().unwrap();
        assert_eq!(retrieved, token);
        assert!(db.get_invite("missing").unwrap().is_none());
    }

    #[test]
    fn test_consume_is_single_use() {
        let db = setup_db();
        db.insert_invite(&make_token("tok-1")).unwrap();

        let now = Utc::now().to_rfc3339();
        assert!(consume_invite_sql(db.conn(), "tok-1", &now).unwrap());
        // Second consume loses the conditional update
        assert!(!consume_invite_sql(db.conn(), "tok-1", &now).unwrap());

        let stored = db.get_invite("tok-1").unwrap().unwrap();
        assert!(stored.is_consumed());
    }

    #[test]
    fn test_consume_and_insert_doctor_atomic() {
        let db = setup_db();
        db.insert_invite(&make_token("tok-1")).unwrap();

        let doctor = Doctor::new(crate::test_fixtures::sample_doctor_profile());
        let now = Utc::now().to_rfc3339();

        assert!(db
            .consume_and_insert_doctor("tok-1", &now, &doctor)
            .unwrap());
        assert!(db.get_doctor(&doctor.id).unwrap().is_some());

        // The token is spent; a second bind writes nothing
        let other = Doctor::new(crate::test_fixtures::sample_doctor_profile());
        assert!(!db.consume_and_insert_doctor("tok-1", &now, &other).unwrap());
        assert!(db.get_doctor(&other.id).unwrap().is_none());
    }
}
