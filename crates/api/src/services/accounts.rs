//! Account lifecycle: registration, login, profile, verification codes and
//! password reset.
//!
//! An account moves `unverified -> verified` exactly once, when a mailed
//! verification code is confirmed. A pending reset code is tracked
//! independently of verification and expires after the configured TTL.

use chrono::{Duration, Utc};

use marketplace_core::{AccountId, Email};

use super::credentials::{hash_password, verify_password};
use super::email::{Mailer, OutboundEmail, generate_verification_code};
use super::sessions::SessionIssuer;
use super::{Result, ServiceError};
use crate::db::{RepositoryError, Store};
use crate::models::{Account, AccountProfile, NewAccount};

const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Registration input, already validated.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

/// Account lifecycle service.
pub struct AccountService<'a> {
    store: &'a dyn Store,
    sessions: &'a SessionIssuer,
    mailer: &'a dyn Mailer,
    public_url: &'a str,
    reset_ttl: Duration,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        sessions: &'a SessionIssuer,
        mailer: &'a dyn Mailer,
        public_url: &'a str,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            mailer,
            public_url,
            reset_ttl,
        }
    }

    /// Register a new unverified account and open a session for it.
    ///
    /// No verification code is sent; that is a separate step.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the email is already registered.
    pub async fn register(&self, registration: Registration) -> Result<String> {
        let password_hash = hash_password(&registration.password)?;

        let account = self
            .store
            .insert_account(NewAccount {
                name: registration.name,
                email: registration.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ServiceError::Conflict("an account with this email already exists".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(account_id = %account.id, "Account registered");
        self.sessions.issue_account(account.id)
    }

    /// Check credentials and open a session.
    ///
    /// Verification state does not gate login.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` for an unknown email or a wrong
    /// password, without saying which.
    pub async fn login(&self, email: &Email, password: &str) -> Result<String> {
        let account = self.authenticate(email, password).await?;
        self.sessions.issue_account(account.id)
    }

    /// Look up an account by email and check its password.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` on any mismatch.
    pub async fn authenticate(&self, email: &Email, password: &str) -> Result<Account> {
        let account = self
            .store
            .account_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &account.password_hash) {
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Ok(account)
    }

    /// The public profile of an account.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists.
    pub async fn profile(&self, id: AccountId) -> Result<AccountProfile> {
        let account = self.load(id).await?;
        Ok(AccountProfile::from(&account))
    }

    /// Generate a verification code, store it and mail a verification link.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidState` if the account is missing or
    /// already verified, and `ServiceError::Dependency` if the mail cannot
    /// be delivered.
    pub async fn send_verification_code(&self, id: AccountId) -> Result<()> {
        let mut account = self
            .store
            .account_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::InvalidState("account not found".to_string()))?;
        if account.is_verified {
            return Err(ServiceError::InvalidState(
                "account is already verified".to_string(),
            ));
        }

        let code = generate_verification_code();
        account.verification_code = Some(code.clone());
        self.persist(&account).await?;

        let link = format!(
            "{}/api/user/verify-otp?code={code}&uid={}",
            self.public_url, account.id
        );
        let email = OutboundEmail::verification(account.email.as_str(), &account.name, &code, &link)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.deliver(email).await?;

        tracing::info!(account_id = %account.id, "Verification code sent");
        Ok(())
    }

    /// Confirm a verification code.
    ///
    /// Confirming an already verified account succeeds without changes.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account does not exist and
    /// `ServiceError::InvalidOtp` if the code does not match.
    pub async fn verify_code(&self, id: AccountId, code: &str) -> Result<()> {
        let mut account = self.load(id).await?;
        if account.is_verified {
            return Ok(());
        }

        if account.verification_code.as_deref() != Some(code.trim()) {
            return Err(ServiceError::InvalidOtp);
        }

        account.is_verified = true;
        account.verification_code = None;
        self.persist(&account).await?;

        tracing::info!(account_id = %account.id, "Account verified");
        Ok(())
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists.
    pub async fn update_profile(&self, id: AccountId, name: String) -> Result<AccountProfile> {
        let mut account = self.load(id).await?;
        account.name = name;
        self.persist(&account).await?;
        Ok(AccountProfile::from(&account))
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists and
    /// `ServiceError::Unauthorized` if the current password is wrong.
    pub async fn update_password(
        &self,
        id: AccountId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut account = self.load(id).await?;
        if !verify_password(old_password, &account.password_hash) {
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        account.password_hash = hash_password(new_password)?;
        self.persist(&account).await?;

        tracing::info!(account_id = %account.id, "Password changed");
        Ok(())
    }

    /// Generate a reset code and mail a reset link.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown email and
    /// `ServiceError::Dependency` if the mail cannot be delivered.
    pub async fn forgot_password(&self, email: &Email) -> Result<()> {
        let mut account = self
            .store
            .account_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("account not found".to_string()))?;

        let code = generate_verification_code();
        account.reset_code = Some(code.clone());
        account.reset_expires_at = Some(Utc::now() + self.reset_ttl);
        self.persist(&account).await?;

        let link = format!(
            "{}/reset-password?code={code}&uid={}",
            self.public_url, account.id
        );
        let email = OutboundEmail::password_reset(
            account.email.as_str(),
            &account.name,
            &code,
            &link,
            self.reset_ttl.num_minutes(),
        )
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.deliver(email).await?;

        tracing::info!(account_id = %account.id, "Password reset code sent");
        Ok(())
    }

    /// Set a new password using a mailed reset code.
    ///
    /// The code is single-use. An expired code is cleared and rejected.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account does not exist and
    /// `ServiceError::InvalidOtp` if the code is wrong, missing or expired.
    pub async fn reset_password(&self, id: AccountId, code: &str, new_password: &str) -> Result<()> {
        let mut account = self.load(id).await?;

        if account.reset_code.as_deref() != Some(code.trim()) {
            return Err(ServiceError::InvalidOtp);
        }

        if !account.has_pending_reset(Utc::now()) {
            account.reset_code = None;
            account.reset_expires_at = None;
            self.persist(&account).await?;
            return Err(ServiceError::InvalidOtp);
        }

        account.password_hash = hash_password(new_password)?;
        account.reset_code = None;
        account.reset_expires_at = None;
        self.persist(&account).await?;

        tracing::info!(account_id = %account.id, "Password reset");
        Ok(())
    }

    /// Hard-delete the account record. Vendors and products are left alone.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account does not exist.
    pub async fn delete_account(&self, id: AccountId) -> Result<()> {
        if !self.store.delete_account(id).await? {
            return Err(ServiceError::NotFound("account not found".to_string()));
        }
        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    async fn load(&self, id: AccountId) -> Result<Account> {
        self.store
            .account_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("account not found".to_string()))
    }

    async fn persist(&self, account: &Account) -> Result<()> {
        if self.store.save_account(account).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("account not found".to_string()))
        }
    }

    async fn deliver(&self, email: OutboundEmail) -> Result<()> {
        let to = email.to.clone();
        self.mailer.send(email).await.map_err(|e| {
            tracing::error!(to = %to, error = %e, "Email delivery failed");
            ServiceError::Dependency("email delivery failed".to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::config::SessionConfig;
    use crate::db::{AccountStore, MemoryStore};
    use crate::services::email::{EmailError, MemoryMailer};

    struct Fixture {
        store: MemoryStore,
        sessions: SessionIssuer,
        mailer: MemoryMailer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                sessions: SessionIssuer::new(&SessionConfig {
                    account_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
                    vendor_secret: SecretString::from("Zq8!wE4@rT6#yU2$iO9%pA1^sD3&fG7"),
                    ttl: Duration::days(5),
                }),
                mailer: MemoryMailer::new(),
            }
        }

        fn service(&self) -> AccountService<'_> {
            AccountService::new(
                &self.store,
                &self.sessions,
                &self.mailer,
                "https://shop.test",
                Duration::minutes(15),
            )
        }

        async fn register(&self, email: &str) -> AccountId {
            let token = self
                .service()
                .register(Registration {
                    name: "A".to_string(),
                    email: Email::parse(email).unwrap(),
                    password: "secret1".to_string(),
                })
                .await
                .unwrap();
            self.sessions.validate_account(&token).unwrap()
        }

        fn last_code(&self, email: &str) -> String {
            let message = self.mailer.last_to(email).unwrap();
            let start = message.text_body.find("code=").unwrap() + "code=".len();
            message.text_body[start..start + 6].to_string()
        }
    }

    struct BrokenMailer;

    #[async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _email: OutboundEmail) -> std::result::Result<(), EmailError> {
            Err(EmailError::InvalidAddress("relay down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let fx = Fixture::new();
        fx.register("a@x.com").await;

        let err = fx
            .service()
            .register(Registration {
                name: "B".to_string(),
                email: Email::parse("a@x.com").unwrap(),
                password: "other-pass".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stored_hash_is_not_plaintext() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let account = fx.store.account_by_id(id).await.unwrap().unwrap();
        assert_ne!(account.password_hash, "secret1");
        assert!(!account.is_verified);
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_failed() {
        let fx = Fixture::new();
        fx.register("a@x.com").await;
        let service = fx.service();

        let unknown = service
            .login(&Email::parse("b@x.com").unwrap(), "secret1")
            .await
            .unwrap_err();
        let wrong = service
            .login(&Email::parse("a@x.com").unwrap(), "secret2")
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_verification_flow() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = fx.service();

        service.send_verification_code(id).await.unwrap();
        let code = fx.last_code("a@x.com");

        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(matches!(
            service.verify_code(id, wrong).await,
            Err(ServiceError::InvalidOtp)
        ));

        service.verify_code(id, &code).await.unwrap();
        let account = fx.store.account_by_id(id).await.unwrap().unwrap();
        assert!(account.is_verified);
        assert!(account.verification_code.is_none());

        // Repeat confirmation with any code is still a success.
        service.verify_code(id, "999999").await.unwrap();

        assert!(matches!(
            service.send_verification_code(id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_unknown_account_is_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.service().verify_code(AccountId::generate(), "123456").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mail_failure_is_a_dependency_error() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = AccountService::new(
            &fx.store,
            &fx.sessions,
            &BrokenMailer,
            "https://shop.test",
            Duration::minutes(15),
        );

        assert!(matches!(
            service.send_verification_code(id).await,
            Err(ServiceError::Dependency(_))
        ));
    }

    #[tokio::test]
    async fn test_password_reset_is_single_use() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = fx.service();
        let email = Email::parse("a@x.com").unwrap();

        service.forgot_password(&email).await.unwrap();
        let code = fx.last_code("a@x.com");

        service.reset_password(id, &code, "brand-new").await.unwrap();
        assert!(service.login(&email, "brand-new").await.is_ok());
        assert!(service.login(&email, "secret1").await.is_err());

        assert!(matches!(
            service.reset_password(id, &code, "again-new").await,
            Err(ServiceError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn test_expired_reset_code_is_rejected_and_cleared() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = fx.service();

        service
            .forgot_password(&Email::parse("a@x.com").unwrap())
            .await
            .unwrap();
        let code = fx.last_code("a@x.com");

        let mut account = fx.store.account_by_id(id).await.unwrap().unwrap();
        account.reset_expires_at = Some(Utc::now() - Duration::minutes(1));
        fx.store.save_account(&account).await.unwrap();

        assert!(matches!(
            service.reset_password(id, &code, "brand-new").await,
            Err(ServiceError::InvalidOtp)
        ));
        let account = fx.store.account_by_id(id).await.unwrap().unwrap();
        assert!(account.reset_code.is_none());
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.service()
                .forgot_password(&Email::parse("nobody@x.com").unwrap())
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_password_requires_current() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = fx.service();

        assert!(matches!(
            service.update_password(id, "nope-nope", "brand-new").await,
            Err(ServiceError::Unauthorized(_))
        ));
        service.update_password(id, "secret1", "brand-new").await.unwrap();
        assert!(
            service
                .login(&Email::parse("a@x.com").unwrap(), "brand-new")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_delete_account() {
        let fx = Fixture::new();
        let id = fx.register("a@x.com").await;
        let service = fx.service();

        service.delete_account(id).await.unwrap();
        assert!(matches!(
            service.profile(id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_account(id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
