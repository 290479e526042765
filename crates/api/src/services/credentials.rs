//! Password hashing with Argon2id.
//!
//! Hashes are self-describing PHC strings (algorithm, parameters and salt
//! travel with the hash), so callers persist them as opaque text on the
//! owning account.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::ServiceError;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns `ServiceError::Internal` if the hasher rejects the input.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash.
///
/// An unparseable hash never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
