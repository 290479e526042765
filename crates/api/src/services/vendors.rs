//! Vendor sessions, profiles and logos.

use marketplace_core::{AccountId, AccountKind, Email, VendorId};

use super::credentials::verify_password;
use super::sessions::SessionIssuer;
use super::uploads::UploadStore;
use super::{Result, ServiceError};
use crate::db::Store;
use crate::models::Vendor;

/// Profile changes. Both fields are always replaced together.
#[derive(Debug, Clone)]
pub struct VendorUpdate {
    pub business_name: String,
    pub brand_description: String,
}

/// Vendor lifecycle service.
pub struct VendorService<'a> {
    store: &'a dyn Store,
    sessions: &'a SessionIssuer,
    uploads: &'a UploadStore,
}

impl<'a> VendorService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        sessions: &'a SessionIssuer,
        uploads: &'a UploadStore,
    ) -> Self {
        Self {
            store,
            sessions,
            uploads,
        }
    }

    /// Log in with account credentials and open a vendor session.
    ///
    /// The vendor record is created on first login.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` for bad credentials and
    /// `ServiceError::Forbidden` if the account is not a vendor account.
    pub async fn login(&self, email: &Email, password: &str) -> Result<(String, Vendor)> {
        let account = self
            .store
            .account_by_email(email)
            .await?
            .filter(|account| verify_password(password, &account.password_hash))
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".to_string()))?;

        if account.kind != AccountKind::Vendor {
            return Err(ServiceError::Forbidden(
                "account is not a vendor account".to_string(),
            ));
        }

        let vendor = self.ensure_vendor_for_account(account.id).await?;
        let token = self.sessions.issue_vendor(vendor.id)?;
        Ok((token, vendor))
    }

    /// Return the account's vendor, creating an empty one if it has none.
    ///
    /// Safe to call concurrently: at most one vendor per account is created.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn ensure_vendor_for_account(&self, account_id: AccountId) -> Result<Vendor> {
        let (vendor, created) = self.store.create_vendor_if_absent(account_id).await?;
        if created {
            tracing::info!(vendor_id = %vendor.id, account_id = %account_id, "Vendor created");
        }
        Ok(vendor)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the vendor does not exist.
    pub async fn profile(&self, id: VendorId) -> Result<Vendor> {
        self.load(id).await
    }

    /// Apply profile changes.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the vendor does not exist.
    pub async fn update_profile(&self, id: VendorId, update: VendorUpdate) -> Result<Vendor> {
        let mut vendor = self.load(id).await?;
        vendor.business_name = Some(update.business_name);
        vendor.brand_description = Some(update.brand_description);
        self.persist(&vendor).await?;
        Ok(vendor)
    }

    /// Record a freshly stored logo, replacing any previous one.
    ///
    /// The previous file is deleted before the new path is recorded. If the
    /// update fails the new file is deleted as well.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the vendor does not exist.
    pub async fn update_logo(&self, id: VendorId, stored_logo: String) -> Result<Vendor> {
        let result = self.replace_logo(id, &stored_logo).await;
        if result.is_err() {
            self.uploads.remove_all([stored_logo.as_str()]).await;
        }
        result
    }

    async fn replace_logo(&self, id: VendorId, stored_logo: &str) -> Result<Vendor> {
        let mut vendor = self.load(id).await?;
        if let Some(previous) = vendor.brand_logo.take() {
            self.uploads.remove_all([previous.as_str()]).await;
        }
        vendor.brand_logo = Some(stored_logo.to_string());
        self.persist(&vendor).await?;
        Ok(vendor)
    }

    /// Delete the vendor record and its logo file. Products are left alone.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the vendor does not exist.
    pub async fn delete(&self, id: VendorId) -> Result<()> {
        let vendor = self.load(id).await?;
        if !self.store.delete_vendor(id).await? {
            return Err(ServiceError::NotFound("vendor not found".to_string()));
        }
        if let Some(logo) = vendor.brand_logo.as_deref() {
            self.uploads.remove_all([logo]).await;
        }
        tracing::info!(vendor_id = %id, "Vendor deleted");
        Ok(())
    }

    async fn load(&self, id: VendorId) -> Result<Vendor> {
        self.store
            .vendor_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("vendor not found".to_string()))
    }

    async fn persist(&self, vendor: &Vendor) -> Result<()> {
        if self.store.save_vendor(vendor).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("vendor not found".to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::config::SessionConfig;
    use crate::db::{AccountStore, MemoryStore};
    use crate::models::NewAccount;
    use crate::services::credentials::hash_password;
    use marketplace_core::UploadFolder;

    struct Fixture {
        store: MemoryStore,
        sessions: SessionIssuer,
        uploads: UploadStore,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                store: MemoryStore::new(),
                sessions: SessionIssuer::new(&SessionConfig {
                    account_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
                    vendor_secret: SecretString::from("Zq8!wE4@rT6#yU2$iO9%pA1^sD3&fG7"),
                    ttl: Duration::days(5),
                }),
                uploads: UploadStore::new(dir.path()),
                _dir: dir,
            }
        }

        fn service(&self) -> VendorService<'_> {
            VendorService::new(&self.store, &self.sessions, &self.uploads)
        }

        async fn account(&self, email: &str, kind: AccountKind) -> AccountId {
            let mut account = self
                .store
                .insert_account(NewAccount {
                    name: "V".to_string(),
                    email: Email::parse(email).unwrap(),
                    password_hash: hash_password("secret1").unwrap(),
                })
                .await
                .unwrap();
            account.kind = kind;
            self.store.save_account(&account).await.unwrap();
            account.id
        }
    }

    #[tokio::test]
    async fn test_login_provisions_vendor_once() {
        let fx = Fixture::new();
        let account_id = fx.account("v@x.com", AccountKind::Vendor).await;
        let email = Email::parse("v@x.com").unwrap();

        let (token, first) = fx.service().login(&email, "secret1").await.unwrap();
        assert_eq!(first.account_id, account_id);
        assert!(first.business_name.is_none());
        assert_eq!(fx.sessions.validate_vendor(&token).unwrap(), first.id);

        let (_, second) = fx.service().login(&email, "secret1").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_login_rejects_user_accounts() {
        let fx = Fixture::new();
        fx.account("u@x.com", AccountKind::User).await;

        let result = fx
            .service()
            .login(&Email::parse("u@x.com").unwrap(), "secret1")
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let fx = Fixture::new();
        fx.account("v@x.com", AccountKind::Vendor).await;

        let result = fx
            .service()
            .login(&Email::parse("v@x.com").unwrap(), "wrong-one")
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_profile_sets_both_fields() {
        let fx = Fixture::new();
        let account_id = fx.account("v@x.com", AccountKind::Vendor).await;
        let vendor = fx.service().ensure_vendor_for_account(account_id).await.unwrap();

        let updated = fx
            .service()
            .update_profile(
                vendor.id,
                VendorUpdate {
                    business_name: "Acme".to_string(),
                    brand_description: "Tools".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.business_name.as_deref(), Some("Acme"));
        assert_eq!(updated.brand_description.as_deref(), Some("Tools"));

        let stored = fx.service().profile(vendor.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_logo_replaces_previous_file() {
        let fx = Fixture::new();
        let account_id = fx.account("v@x.com", AccountKind::Vendor).await;
        let vendor = fx.service().ensure_vendor_for_account(account_id).await.unwrap();

        let first = fx
            .uploads
            .write(UploadFolder::VendorLogo, Some("a.png"), b"a")
            .await
            .unwrap();
        fx.service().update_logo(vendor.id, first.clone()).await.unwrap();

        let second = fx
            .uploads
            .write(UploadFolder::VendorLogo, Some("b.png"), b"b")
            .await
            .unwrap();
        let updated = fx.service().update_logo(vendor.id, second.clone()).await.unwrap();

        assert_eq!(updated.brand_logo.as_deref(), Some(second.as_str()));
        assert!(!fx.uploads.exists(&first).await);
        assert!(fx.uploads.exists(&second).await);
    }

    #[tokio::test]
    async fn test_update_logo_for_missing_vendor_discards_file() {
        let fx = Fixture::new();
        let stored = fx
            .uploads
            .write(UploadFolder::VendorLogo, Some("a.png"), b"a")
            .await
            .unwrap();

        let result = fx
            .service()
            .update_logo(VendorId::generate(), stored.clone())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(!fx.uploads.exists(&stored).await);
    }

    #[tokio::test]
    async fn test_delete_vendor() {
        let fx = Fixture::new();
        let account_id = fx.account("v@x.com", AccountKind::Vendor).await;
        let vendor = fx.service().ensure_vendor_for_account(account_id).await.unwrap();

        fx.service().delete(vendor.id).await.unwrap();
        assert!(matches!(
            fx.service().profile(vendor.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(fx.store.account_by_id(account_id).await.unwrap().is_some());
    }
}
