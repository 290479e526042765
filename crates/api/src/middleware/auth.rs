//! Session extractors.
//!
//! A session token is read from the `x-access-token` header, or from
//! `Authorization` with or without a `Bearer ` prefix. An empty
//! `x-access-token` does not shadow `Authorization`. Account and vendor
//! sessions are signed with different secrets, so a token of one kind is
//! rejected by the other extractor.

use axum::{extract::FromRequestParts, http::request::Parts};

use marketplace_core::{AccountId, VendorId};

use crate::error::{AppError, set_sentry_user};
use crate::services::ServiceError;
use crate::state::AppState;

/// Custom header carrying a session token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Extractor that requires a valid account session.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(
///     State(state): State<AppState>,
///     AccountSession(account_id): AccountSession,
/// ) -> Result<Json<AccountProfile>> { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AccountSession(pub AccountId);

/// Extractor that requires a valid vendor session.
#[derive(Debug, Clone, Copy)]
pub struct VendorSession(pub VendorId);

impl FromRequestParts<AppState> for AccountSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let account_id = state.sessions().validate_account(token)?;
        set_sentry_user(&account_id);
        Ok(Self(account_id))
    }
}

impl FromRequestParts<AppState> for VendorSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let vendor_id = state.sessions().validate_vendor(token)?;
        set_sentry_user(&vendor_id);
        Ok(Self(vendor_id))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    [ACCESS_TOKEN_HEADER, "authorization"]
        .into_iter()
        .filter_map(|name| parts.headers.get(name)?.to_str().ok())
        .map(|raw| raw.trim_start().strip_prefix("Bearer ").unwrap_or(raw).trim())
        .find(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("missing token".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(name: &str, value: &str) -> Parts {
        Request::builder()
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_token_sources() {
        assert_eq!(bearer_token(&parts("x-access-token", "abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&parts("authorization", "Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&parts("authorization", "abc")).unwrap(), "abc");

        let mut both = parts("x-access-token", "");
        both.headers
            .insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&both).unwrap(), "abc");
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(
            bearer_token(&parts("x-other", "abc")),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(bearer_token(&parts("authorization", "Bearer ")).is_err());
    }
}
