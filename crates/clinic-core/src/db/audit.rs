//! Audit log database operations.
//!
//! The log is append-only; `seq` orders entries globally so the hash chain
//! can be replayed in insertion order.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{AuditEntry, EntityKind};

impl Database {
    /// Append an entry to the audit log.
    pub fn append_audit(&self, entry: &AuditEntry) -> DbResult<()> {
        append_audit_sql(&self.conn, entry)
    }

    /// Hash of the most recently appended entry, if any.
    pub fn last_audit_hash(&self) -> DbResult<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT entry_hash FROM audit_log ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Audit trail for one entity, in chain order.
    pub fn audit_for_entity(&self, kind: EntityKind, entity_id: &str) -> DbResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUDIT_SELECT} WHERE entity_kind = ? AND entity_id = ? ORDER BY seq"
        ))?;
        let rows = stmt.query_map(params![kind.as_str(), entity_id], map_audit_row)?;
        collect_entries(rows)
    }

    /// The entire audit log in chain order, for verification.
    pub fn all_audit_entries(&self) -> DbResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(&format!("{AUDIT_SELECT} ORDER BY seq"))?;
        let rows = stmt.query_map([], map_audit_row)?;
        collect_entries(rows)
    }
}

const AUDIT_SELECT: &str = r#"
    SELECT id, entity_kind, entity_id, from_status, to_status,
           actor_id, reason, prev_hash, entry_hash, created_at
    FROM audit_log
"#;

pub(crate) fn append_audit_sql(conn: &Connection, entry: &AuditEntry) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO audit_log (
            id, entity_kind, entity_id, from_status, to_status,
            actor_id, reason, prev_hash, entry_hash, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            entry.id,
            entry.entity_kind.as_str(),
            entry.entity_id,
            entry.from_status,
            entry.to_status,
            entry.actor_id,
            entry.reason,
            entry.prev_hash,
            entry.entry_hash,
            entry.created_at,
        ],
    )?;
    Ok(())
}

struct AuditRow {
    id: String,
    entity_kind: String,
    entity_id: String,
    from_status: String,
    to_status: String,
    actor_id: String,
    reason: Option<String>,
    prev_hash: Option<String>,
    entry_hash: String,
    created_at: String,
}

fn map_audit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        id: row.get(0)?,
        entity_kind: row.get(1)?,
        entity_id: row.get(2)?,
        from_status: row.get(3)?,
        to_status: row.get(4)?,
        actor_id: row.get(5)?,
        reason: row.get(6)?,
        prev_hash: row.get(7)?,
        entry_hash: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<AuditRow>>,
) -> DbResult<Vec<AuditEntry>> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.try_into()?);
    }
    Ok(entries)
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DbError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let entity_kind = EntityKind::parse(&row.entity_kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown entity kind: {}", row.entity_kind)))?;
        Ok(AuditEntry {
            id: row.id,
            entity_kind,
            entity_id: row.entity_id,
            from_status: row.from_status,
            to_status: row.to_status,
            actor_id: row.actor_id,
            reason: row.reason,
            prev_hash: row.prev_hash,
            entry_hash: row.entry_hash,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn chained_entry(db: &Database, entity_id: &str, from: &str, to: &str) -> AuditEntry {
        let prev = db.last_audit_hash().unwrap();
        AuditEntry::new(EntityKind::Patient, entity_id, from, to, "admin-1", None, prev)
    }

    #[test]
    fn test_append_and_read_back() {
        let db = setup_db();
        let entry = chained_entry(&db, "p-1", "pending", "approved");
        db.append_audit(&entry).unwrap();

        let trail = db.audit_for_entity(EntityKind::Patient, "p-1").unwrap();
        assert_eq!(trail, vec![entry]);
    }

    #[test]
    fn test_last_hash_follows_appends() {
        let db = setup_db();
        assert!(db.last_audit_hash().unwrap().is_none());

        let first = chained_entry(&db, "p-1", "pending", "approved");
        db.append_audit(&first).unwrap();
        assert_eq!(db.last_audit_hash().unwrap(), Some(first.entry_hash.clone()));

        let second = chained_entry(&db, "p-2", "pending", "rejected");
        assert_eq!(second.prev_hash, Some(first.entry_hash));
        db.append_audit(&second).unwrap();
        assert_eq!(db.last_audit_hash().unwrap(), Some(second.entry_hash));
    }

    #[test]
    fn test_all_entries_in_seq_order() {
        let db = setup_db();
        for (id, to) in [("p-1", "approved"), ("p-2", "rejected"), ("p-1", "cured")] {
            let entry = chained_entry(&db, id, "pending", to);
            db.append_audit(&entry).unwrap();
        }

        let all = db.all_audit_entries().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].prev_hash, None);
        assert_eq!(all[1].prev_hash, Some(all[0].entry_hash.clone()));
        assert_eq!(all[2].prev_hash, Some(all[1].entry_hash.clone()));
    }

    #[test]
    fn test_duplicate_entry_hash_rejected() {
        let db = setup_db();
        let entry = chained_entry(&db, "p-1", "pending", "approved");
        db.append_audit(&entry).unwrap();

        let mut dup = entry.clone();
        dup.id = uuid::Uuid::new_v4().to_string();
        assert!(db.append_audit(&dup).is_err());
    }
}
