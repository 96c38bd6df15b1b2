//! Enrollment: invite tokens and registration binding.
//!
//! Doctors join by admin invite; patients join by an invite from their
//! doctor or by naming the doctor's public identifier directly. Tokens are
//! single-use and expire; a registration either fully lands (token consumed,
//! record inserted) or leaves nothing behind.

mod binder;
mod issuer;

pub use binder::{PatientBinding, RegistrationBinder};
pub use issuer::TokenIssuer;

use thiserror::Error;

use crate::db::DbError;

/// Hours an invite token stays valid after issue.
pub const TOKEN_VALIDITY_HOURS: i64 = 72;

/// Enrollment errors.
#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Invite token not found")]
    TokenNotFound,

    #[error("Invite token has already been used")]
    TokenAlreadyConsumed,

    #[error("Invite token has expired")]
    TokenExpired,

    #[error("Invite token was issued for a {expected} registration")]
    TokenRoleMismatch { expected: &'static str },

    #[error("No approved doctor found for public id {0}")]
    DoctorNotFound(String),

    #[error("Invalid registration: {0}")]
    Validation(String),
}

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;
