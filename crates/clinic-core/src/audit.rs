//! Audit chain service: building chained entries and verifying the log.

use thiserror::Error;

use crate::db::{Database, DbError, DbResult};
use crate::models::{AuditEntry, EntityKind};

/// Audit chain errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Audit chain broken at entry {seq}: {detail}")]
    ChainBroken { seq: usize, detail: String },
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Hash-chained audit log: builds the next linked entry for writers and
/// verifies the stored chain.
pub struct AuditChain<'a> {
    db: &'a Database,
}

impl<'a> AuditChain<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Build the next chain entry, linked to the current log head.
    ///
    /// The caller persists it, usually inside the same transaction as the
    /// transition it records.
    pub fn prepare(
        &self,
        entity_kind: EntityKind,
        entity_id: &str,
        from_status: &str,
        to_status: &str,
        actor_id: &str,
        reason: Option<&str>,
    ) -> DbResult<AuditEntry> {
        let prev_hash = self.db.last_audit_hash()?;
        Ok(AuditEntry::new(
            entity_kind,
            entity_id,
            from_status,
            to_status,
            actor_id,
            reason,
            prev_hash,
        ))
    }

    /// Trail for one entity, oldest first.
    pub fn for_entity(&self, kind: EntityKind, entity_id: &str) -> AuditResult<Vec<AuditEntry>> {
        Ok(self.db.audit_for_entity(kind, entity_id)?)
    }

    /// Replay the whole log and check every link and hash.
    pub fn verify(&self) -> AuditResult<()> {
        let entries = self.db.all_audit_entries()?;
        let mut prev_hash: Option<String> = None;

        for (seq, entry) in entries.iter().enumerate() {
            if entry.prev_hash != prev_hash {
                return Err(AuditError::ChainBroken {
                    seq,
                    detail: "prev_hash does not match preceding entry".into(),
                });
            }
            if entry.compute_hash() != entry.entry_hash {
                return Err(AuditError::ChainBroken {
                    seq,
                    detail: "entry hash does not match entry contents".into(),
                });
            }
            prev_hash = Some(entry.entry_hash.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn append(chain: &AuditChain<'_>, db: &Database, entity_id: &str, to: &str) {
        let entry = chain
            .prepare(EntityKind::Patient, entity_id, "pending", to, "admin-1", None)
            .unwrap();
        db.append_audit(&entry).unwrap();
    }

    #[test]
    fn test_empty_log_verifies() {
        let db = setup_db();
        assert!(AuditChain::new(&db).verify().is_ok());
    }

    #[test]
    fn test_chain_links_and_verifies() {
        let db = setup_db();
        let chain = AuditChain::new(&db);
        append(&chain, &db, "p-1", "approved");
        append(&chain, &db, "p-2", "rejected");
        append(&chain, &db, "p-3", "approved");

        assert!(chain.verify().is_ok());
        let trail = chain.for_entity(EntityKind::Patient, "p-2").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].to_status, "rejected");
    }

    #[test]
    fn test_tampered_entry_detected() {
        let db = setup_db();
        let chain = AuditChain::new(&db);
        append(&chain, &db, "p-1", "approved");
        append(&chain, &db, "p-2", "rejected");

        db.conn()
            .execute(
                "UPDATE audit_log SET reason = 'doctored' WHERE entity_id = 'p-1'",
                [],
            )
            .unwrap();

        assert!(matches!(
            chain.verify(),
            Err(AuditError::ChainBroken { seq: 0, .. })
        ));
    }

    #[test]
    fn test_broken_link_detected() {
        let db = setup_db();
        let chain = AuditChain::new(&db);
        append(&chain, &db, "p-1", "approved");
        append(&chain, &db, "p-2", "rejected");

        db.conn()
            .execute(
                "UPDATE audit_log SET prev_hash = NULL WHERE entity_id = 'p-2'",
                [],
            )
            .unwrap();

        assert!(matches!(
            chain.verify(),
            Err(AuditError::ChainBroken { seq: 1, .. })
        ));
    }
}
