//! Identity store error types.

use strata_schema::ValidationError;
use thiserror::Error;

/// Error raised by the identity record store or token issuance.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A custom attribute failed schema validation. User-visible and
    /// recoverable by resubmission.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An account already exists under this email.
    #[error("an identity record already exists for '{email}'")]
    DuplicateEmail { email: String },

    /// No record with the given identifier.
    #[error("identity record not found")]
    RecordNotFound,

    /// A supplied attribute has no declared schema.
    #[error("attribute '{name}' is not declared in the schema")]
    UnknownAttribute { name: String },

    /// A required-at-signup attribute was not supplied.
    #[error("required attribute '{name}' missing at sign-up")]
    MissingAttribute { name: String },

    /// The record exists but has not completed verification.
    #[error("identity record is not confirmed")]
    NotConfirmed,

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token encoding or validation failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The store's lock was poisoned by a panicking writer.
    #[error("identity store lock poisoned")]
    LockPoisoned,
}
