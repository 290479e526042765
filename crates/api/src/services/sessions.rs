//! Signed session tokens for accounts and vendors.
//!
//! Tokens are HS256 JWTs. Account tokens carry `userId`, vendor tokens carry
//! `vendorId`, and each kind is signed with its own secret, so a token of
//! one kind never validates as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use marketplace_core::{AccountId, VendorId};

use super::ServiceError;
use crate::config::SessionConfig;

/// Claims of an account session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountClaims {
    pub user_id: AccountId,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Claims of a vendor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorClaims {
    pub vendor_id: VendorId,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Mints and validates session tokens.
///
/// Built from explicit configuration; it never reads the environment.
pub struct SessionIssuer {
    account: SigningKeys,
    vendor: SigningKeys,
    ttl: Duration,
    validation: Validation,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        validation.leeway = 0;

        Self {
            account: SigningKeys::from_secret(config.account_secret.expose_secret().as_bytes()),
            vendor: SigningKeys::from_secret(config.vendor_secret.expose_secret().as_bytes()),
            ttl: config.ttl,
            validation,
        }
    }

    /// Issue an account session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Internal` if signing fails.
    pub fn issue_account(&self, id: AccountId) -> Result<String, ServiceError> {
        self.issue_account_at(id, Utc::now())
    }

    /// Issue a vendor session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Internal` if signing fails.
    pub fn issue_vendor(&self, id: VendorId) -> Result<String, ServiceError> {
        self.issue_vendor_at(id, Utc::now())
    }

    fn issue_account_at(&self, id: AccountId, now: DateTime<Utc>) -> Result<String, ServiceError> {
        let claims = AccountClaims {
            user_id: id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        sign(&claims, &self.account)
    }

    fn issue_vendor_at(&self, id: VendorId, now: DateTime<Utc>) -> Result<String, ServiceError> {
        let claims = VendorClaims {
            vendor_id: id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        sign(&claims, &self.vendor)
    }

    /// Validate an account session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` if the token is malformed,
    /// expired, or signed with anything but the account secret.
    pub fn validate_account(&self, token: &str) -> Result<AccountId, ServiceError> {
        verify::<AccountClaims>(token, &self.account, &self.validation).map(|c| c.user_id)
    }

    /// Validate a vendor session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` if the token is malformed,
    /// expired, or signed with anything but the vendor secret.
    pub fn validate_vendor(&self, token: &str) -> Result<VendorId, ServiceError> {
        verify::<VendorClaims>(token, &self.vendor, &self.validation).map(|c| c.vendor_id)
    }
}

fn sign<C: Serialize>(claims: &C, keys: &SigningKeys) -> Result<String, ServiceError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| ServiceError::Internal(format!("token signing failed: {e}")))
}

fn verify<C: DeserializeOwned>(
    token: &str,
    keys: &SigningKeys,
    validation: &Validation,
) -> Result<C, ServiceError> {
    jsonwebtoken::decode::<C>(token, &keys.decoding, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("token expired".to_string())
            }
            _ => ServiceError::Unauthorized("invalid token".to_string()),
        })
}
