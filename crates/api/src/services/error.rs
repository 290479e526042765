//! Service error types.

use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::catalog::DeletionReport;

/// A problem with one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur in account, vendor and catalog operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more inputs are missing or malformed.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Missing, malformed or expired session token, or bad credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the account kind does not allow this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The entity does not exist or does not belong to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A verification or reset code did not match.
    #[error("invalid code")]
    InvalidOtp,

    /// The account is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Attachment handling failed mid-request.
    #[error("processing error: {0}")]
    Processing(String),

    /// An outside collaborator (mail relay) failed.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// A cascading delete could not remove every child record.
    #[error("partial deletion: {} variation(s) could not be removed", .0.failed_variations.len())]
    PartialDeletion(DeletionReport),

    /// Unexpected fault.
    #[error("internal error: {0}")]
    Internal(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// A validation error for a single field.
    #[must_use]
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

/// Result type alias for `ServiceError`.
pub type Result<T> = std::result::Result<T, ServiceError>;
