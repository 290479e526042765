//! Request extraction: validated JSON bodies and multipart uploads.

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
};
use serde::de::DeserializeOwned;

use marketplace_core::{Email, UploadFolder};

use crate::error::AppError;
use crate::services::uploads::UploadStore;
use crate::services::{FieldError, ServiceError};

/// Maximum size of one uploaded file.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Body limit for multipart routes: five files plus form fields.
pub const MULTIPART_BODY_LIMIT: usize = 5 * MAX_FILE_BYTES + 64 * 1024;

// =============================================================================
// Validated JSON
// =============================================================================

/// A request body that checks its own fields.
pub trait Validate: Sized {
    /// The checked, typed input handed to a service.
    type Valid;

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns one `FieldError` per invalid field.
    fn validate(self) -> Result<Self::Valid, Vec<FieldError>>;
}

/// JSON extractor that deserializes `T` and validates it.
///
/// Malformed JSON is a `BadRequest`; invalid fields are a validation error
/// listing every field.
pub struct ValidJson<T: Validate>(pub T::Valid);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        body.validate()
            .map(ValidJson)
            .map_err(|errors| ServiceError::Validation(errors).into())
    }
}

/// Collects field errors while checking a request.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// A non-blank string, returned trimmed.
    pub fn required(&mut self, field: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, "is required");
        }
        trimmed.to_string()
    }

    /// A password of at least `min` characters. Not trimmed.
    pub fn password(&mut self, field: &str, value: &str, min: usize) -> String {
        if value.chars().count() < min {
            self.fail(field, &format!("must be at least {min} characters"));
        }
        value.to_string()
    }

    pub fn email(&mut self, field: &str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(_) => {
                self.fail(field, "must be a valid email address");
                None
            }
        }
    }

    /// Parse a required value, recording `message` on failure.
    pub fn parse<T: FromStr>(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<T> {
        let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
            self.fail(field, "is required");
            return None;
        };
        raw.parse().map_or_else(
            |_| {
                self.fail(field, message);
                None
            },
            Some,
        )
    }

    /// Finish checking, producing the valid value if nothing failed.
    ///
    /// `build` is only called when every check passed.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, Vec<FieldError>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        build().ok_or_else(|| vec![FieldError::new("body", "is invalid")])
    }

    /// The collected errors, if any.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every failed field.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.errors))
        }
    }
}

// =============================================================================
// Multipart Uploads
// =============================================================================

/// Files and text fields received from a multipart body.
#[derive(Debug, Default)]
pub struct Received {
    /// Stored paths of the written files, in upload order.
    pub files: Vec<String>,
    pub fields: HashMap<String, String>,
}

impl Received {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Limits for one kind of upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadRules {
    pub field: &'static str,
    pub folder: UploadFolder,
    pub max_files: usize,
}

/// Variation images: field `image`, up to five files.
pub const PRODUCT_IMAGES: UploadRules = UploadRules {
    field: "image",
    folder: UploadFolder::ProductImage,
    max_files: 5,
};

/// Vendor logo: field `logo`, one file.
pub const VENDOR_LOGO: UploadRules = UploadRules {
    field: "logo",
    folder: UploadFolder::VendorLogo,
    max_files: 1,
};

/// Read a multipart body, writing files of the expected field to the store.
///
/// Files of other fields are ignored. On any failure every file written so
/// far is deleted before the error is returned.
///
/// # Errors
///
/// Returns `BadRequest` for a malformed body, a validation error for too
/// many or oversized files, and `ServiceError::Processing` if a file cannot
/// be written.
pub async fn receive(
    multipart: Multipart,
    uploads: &UploadStore,
    rules: UploadRules,
) -> Result<Received, AppError> {
    let mut received = Received::default();
    match read_parts(multipart, uploads, rules, &mut received).await {
        Ok(()) => Ok(received),
        Err(err) => {
            uploads
                .remove_all(received.files.iter().map(String::as_str))
                .await;
            Err(err)
        }
    }
}

async fn read_parts(
    mut multipart: Multipart,
    uploads: &UploadStore,
    rules: UploadRules,
    received: &mut Received,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == rules.field {
            if received.files.len() >= rules.max_files {
                return Err(ServiceError::invalid(
                    rules.field,
                    &format!("at most {} file(s) allowed", rules.max_files),
                )
                .into());
            }

            let original = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(malformed)?;
            if bytes.len() > MAX_FILE_BYTES {
                return Err(ServiceError::invalid(rules.field, "file exceeds 10 MiB").into());
            }

            let stored = uploads
                .write(rules.folder, original.as_deref(), &bytes)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to store uploaded file");
                    ServiceError::Processing(e.to_string())
                })?;
            received.files.push(stored);
        } else if field.file_name().is_none() {
            let value = field.text().await.map_err(malformed)?;
            received.fields.insert(name, value);
        }
    }
    Ok(())
}

fn malformed(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_checks_collect_every_error() {
        let mut checks = Checks::new();
        checks.required("name", "  ");
        checks.email("email", "not-an-email");
        checks.password("password", "12345", 6);

        let Err(ServiceError::Validation(errors)) = checks.into_result() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn test_required_trims() {
        let mut checks = Checks::new();
        assert_eq!(checks.required("name", "  Acme "), "Acme");
        assert!(checks.into_result().is_ok());
    }

    #[test]
    fn test_parse_reports_missing_and_invalid() {
        let mut checks = Checks::new();
        let price: Option<Decimal> = checks.parse("price", Some("19.99"), "must be a number");
        assert_eq!(price, Some(Decimal::new(1999, 2)));

        let missing: Option<u32> = checks.parse("stock", None, "must be a whole number");
        let invalid: Option<u32> = checks.parse("stock", Some("-1"), "must be a whole number");
        assert!(missing.is_none() && invalid.is_none());

        let Err(errors) = checks.finish(|| Some(())) else {
            panic!("expected errors");
        };
        assert_eq!(errors[0].message, "is required");
        assert_eq!(errors[1].message, "must be a whole number");
    }
}
