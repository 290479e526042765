//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error response has the same JSON shape:
//!
//! ```json
//! { "message": "validation failed", "errors": [{ "field": "email", "message": "..." }] }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{FieldError, ServiceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A service operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body could not be read (malformed JSON or multipart).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Service(ServiceError::Repository(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    errors: Vec<FieldError>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(err) => match err {
                ServiceError::Validation(_)
                | ServiceError::InvalidState(_)
                | ServiceError::InvalidOtp => StatusCode::BAD_REQUEST,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict(_) | ServiceError::Repository(RepositoryError::Conflict(_)) => {
                    StatusCode::CONFLICT
                }
                ServiceError::Dependency(_) => StatusCode::BAD_GATEWAY,
                ServiceError::Processing(_)
                | ServiceError::PartialDeletion(_)
                | ServiceError::Internal(_)
                | ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    // Don't expose internal error details to clients
    fn body(&self) -> ErrorBody {
        let (message, errors) = match self {
            Self::BadRequest(message) => (message.clone(), Vec::new()),
            Self::Service(err) => match err {
                ServiceError::Validation(errors) => ("validation failed".to_string(), errors.clone()),
                ServiceError::Unauthorized(message)
                | ServiceError::Forbidden(message)
                | ServiceError::NotFound(message)
                | ServiceError::Conflict(message)
                | ServiceError::InvalidState(message) => (message.clone(), Vec::new()),
                ServiceError::InvalidOtp => ("invalid or expired code".to_string(), Vec::new()),
                ServiceError::Repository(RepositoryError::Conflict(_)) => {
                    ("resource already exists".to_string(), Vec::new())
                }
                ServiceError::Processing(_) => {
                    ("failed to process uploaded files".to_string(), Vec::new())
                }
                ServiceError::Dependency(_) => ("external service error".to_string(), Vec::new()),
                ServiceError::PartialDeletion(report) => (
                    format!(
                        "product not deleted: {} variation(s) could not be removed",
                        report.failed_variations.len()
                    ),
                    Vec::new(),
                ),
                ServiceError::Internal(_) | ServiceError::Repository(_) => {
                    ("internal server error".to_string(), Vec::new())
                }
            },
        };
        ErrorBody { message, errors }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated subject.
pub fn set_sentry_user(subject_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject_id.to_string()),
            ..Default::default()
        }));
    });
}
