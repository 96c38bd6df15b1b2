//! Audit trail models.
//!
//! Entries form a linear hash chain: each entry's hash covers the previous
//! entry's hash plus the entry's canonical JSON payload, so tampering with
//! any historical entry breaks every hash after it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which entity family an audit entry refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Doctor,
    Patient,
}

impl EntityKind {
    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Doctor => "doctor",
            EntityKind::Patient => "patient",
        }
    }

    /// Parse the canonical name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doctor" => Some(EntityKind::Doctor),
            "patient" => Some(EntityKind::Patient),
            _ => None,
        }
    }
}

/// One audit entry for a lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// Status the entity left (lowercase label)
    pub from_status: String,
    /// Status the entity entered (lowercase label, or "cured")
    pub to_status: String,
    pub actor_id: String,
    pub reason: Option<String>,
    /// Hash of the previous chain entry; None for the first entry
    pub prev_hash: Option<String>,
    /// SHA-256 over prev_hash + canonical payload
    pub entry_hash: String,
    pub created_at: String,
}

impl AuditEntry {
    /// Build a chained entry. The hash is fixed at construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entity_kind: EntityKind,
        entity_id: &str,
        from_status: &str,
        to_status: &str,
        actor_id: &str,
        reason: Option<&str>,
        prev_hash: Option<String>,
    ) -> Self {
        let created_at = chrono::Utc::now().to_rfc3339();
        let mut entry = Self {
            id: uuid::Uuid::new_v4().to_string(),
            entity_kind,
            entity_id: entity_id.to_string(),
            from_status: from_status.to_string(),
            to_status: to_status.to_string(),
            actor_id: actor_id.to_string(),
            reason: reason.map(|r| r.to_string()),
            prev_hash,
            entry_hash: String::new(),
            created_at,
        };
        entry.entry_hash = entry.compute_hash();
        entry
    }

    /// Canonical payload the hash covers (everything except the hashes).
    pub fn canonical_payload(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.entity_kind.as_str(),
            self.entity_id,
            self.from_status,
            self.to_status,
            self.actor_id,
            self.reason.as_deref().unwrap_or(""),
            self.created_at,
        )
    }

    /// Recompute the chain hash from the entry's fields.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prev_hash.as_deref().unwrap_or("").as_bytes());
        hasher.update(self.canonical_payload().as_bytes());
        hex::encode(hasher.finalize())
    }
}
