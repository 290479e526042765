//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{AccountId, AccountKind, Email};

/// A registered account (domain type).
///
/// Holds credential material, so it is never serialized directly. Use
/// [`AccountProfile`] for anything that leaves the process.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Login email, unique across accounts.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Whether this account may sign in as a vendor.
    pub kind: AccountKind,
    /// Set once the emailed verification code has been confirmed.
    pub is_verified: bool,
    /// Outstanding email verification code.
    pub verification_code: Option<String>,
    /// Outstanding password reset code.
    pub reset_code: Option<String>,
    /// When the outstanding reset code stops being accepted.
    pub reset_expires_at: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Whether a reset code is outstanding and still within its lifetime.
    #[must_use]
    pub fn has_pending_reset(&self, now: DateTime<Utc>) -> bool {
        self.reset_code.is_some() && self.reset_expires_at.is_some_and(|expires| expires > now)
    }
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
}

/// Public projection of an [`Account`].
///
/// Excludes the password hash and both outstanding codes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub kind: AccountKind,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            kind: account.kind,
            is_verified: account.is_verified,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: AccountId::generate(),
            name: "A".to_string(),
            email: Email::parse("a@x.com").unwrap(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            kind: AccountKind::User,
            is_verified: false,
            verification_code: Some("123456".to_string()),
            reset_code: Some("654321".to_string()),
            reset_expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_hides_credentials() {
        let json = serde_json::to_value(AccountProfile::from(&account())).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("verificationCode"));
        assert!(!object.contains_key("resetCode"));
        assert_eq!(object["email"], "a@x.com");
        assert_eq!(object["isVerified"], false);
    }

    #[test]
    fn test_pending_reset_respects_expiry() {
        let now = Utc::now();
        let mut account = account();
        assert!(!account.has_pending_reset(now));

        account.reset_expires_at = Some(now + chrono::Duration::minutes(15));
        assert!(account.has_pending_reset(now));

        account.reset_expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(!account.has_pending_reset(now));
    }
}
