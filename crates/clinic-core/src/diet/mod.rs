//! Diet plans and compliance tracking.
//!
//! Weekly templates are keyed by diagnosis and matched fuzzily against the
//! diagnosis text on a patient's latest vitals. Assigned plans seed the meal
//! ledger; patients self-report completion and compliance is computed from
//! the ledger alone.

mod compliance;
mod template;

pub use compliance::{ComplianceTracker, DailyCompliance};
pub use template::TemplateResolver;

use thiserror::Error;

use crate::db::DbError;

/// Jaro-Winkler similarity a diagnosis must reach to match a template key.
pub const TEMPLATE_MATCH_THRESHOLD: f64 = 0.85;

/// Diet subsystem errors.
#[derive(Error, Debug)]
pub enum DietError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Patient {0} is not under active treatment")]
    PatientNotActive(String),

    #[error("No diet template matches diagnosis '{0}'")]
    TemplateNotFound(String),

    #[error("Patient {0} has no recorded diagnosis")]
    NoDiagnosis(String),

    #[error("Meal entry not found: {0}")]
    EntryNotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),
}

pub type DietResult<T> = Result<T, DietError>;
