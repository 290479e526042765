//! Account management commands.
//!
//! Registration only ever creates `user` accounts. Promoting an account to
//! `vendor` is an operator action, done here.
//!
//! # Usage
//!
//! ```bash
//! mkt-cli account set-kind -e seller@example.com -k vendor
//! mkt-cli account show -e seller@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)

use std::fmt::Write as _;

use marketplace_api::db::{PgStore, Store};
use marketplace_api::models::Account;
use marketplace_core::{AccountKind, Email};

use super::{CliError, connect};

/// Change the kind of the account registered under `email`.
pub async fn set_kind(email: &str, kind: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;
    let kind: AccountKind = kind
        .parse()
        .map_err(|_| CliError::InvalidKind(kind.to_owned()))?;

    let store = PgStore::new(connect().await?);
    apply_kind(&store, &email, kind).await?;
    Ok(())
}

/// Summarize the account registered under `email`.
pub async fn show(email: &str) -> Result<String, CliError> {
    let email = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;

    let store = PgStore::new(connect().await?);
    describe(&store, &email).await
}

/// Set the account's kind. A vendor profile is not created here; it is
/// provisioned on the account's first vendor login.
async fn apply_kind(store: &dyn Store, email: &Email, kind: AccountKind) -> Result<Account, CliError> {
    let mut account = find(store, email).await?;

    if account.kind == kind {
        tracing::info!("Account {} is already a {}", account.email, kind);
        return Ok(account);
    }

    account.kind = kind;
    if !store.save_account(&account).await? {
        return Err(CliError::AccountNotFound(email.to_string()));
    }

    tracing::info!("Account {} is now a {}", account.email, kind);
    Ok(account)
}

async fn describe(store: &dyn Store, email: &Email) -> Result<String, CliError> {
    let account = find(store, email).await?;

    let mut out = String::new();
    let _ = writeln!(out, "id:        {}", account.id);
    let _ = writeln!(out, "name:      {}", account.name);
    let _ = writeln!(out, "email:     {}", account.email);
    let _ = writeln!(out, "kind:      {}", account.kind);
    let _ = writeln!(out, "verified:  {}", account.is_verified);
    let _ = write!(out, "created:   {}", account.created_at.to_rfc3339());

    if let Some(vendor) = store.vendor_by_account(account.id).await? {
        let _ = write!(
            out,
            "\nvendor:    {} ({})",
            vendor.id,
            vendor.business_name.as_deref().unwrap_or("unnamed")
        );
    }

    Ok(out)
}

async fn find(store: &dyn Store, email: &Email) -> Result<Account, CliError> {
    store
        .account_by_email(email)
        .await?
        .ok_or_else(|| CliError::AccountNotFound(email.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marketplace_api::db::{AccountStore, MemoryStore, VendorStore};
    use marketplace_api::models::NewAccount;

    async fn seeded() -> (MemoryStore, Email) {
        let store = MemoryStore::new();
        let email = Email::parse("seller@example.com").unwrap();
        store
            .insert_account(NewAccount {
                name: "Seller".to_owned(),
                email: email.clone(),
                password_hash: "$argon2id$placeholder".to_owned(),
            })
            .await
            .unwrap();
        (store, email)
    }

    #[tokio::test]
    async fn test_apply_kind_promotes_account() {
        let (store, email) = seeded().await;

        let account = apply_kind(&store, &email, AccountKind::Vendor).await.unwrap();
        assert_eq!(account.kind, AccountKind::Vendor);

        let stored = store.account_by_email(&email).await.unwrap().unwrap();
        assert_eq!(stored.kind, AccountKind::Vendor);
    }

    #[tokio::test]
    async fn test_apply_kind_unknown_email() {
        let (store, _) = seeded().await;
        let other = Email::parse("nobody@example.com").unwrap();

        let result = apply_kind(&store, &other, AccountKind::Vendor).await;
        assert!(matches!(result, Err(CliError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_describe_includes_vendor() {
        let (store, email) = seeded().await;
        let account = apply_kind(&store, &email, AccountKind::Vendor).await.unwrap();

        let summary = describe(&store, &email).await.unwrap();
        assert!(summary.contains("kind:      vendor"));
        assert!(!summary.contains("vendor:    "));

        let (vendor, _) = store.create_vendor_if_absent(account.id).await.unwrap();
        let summary = describe(&store, &email).await.unwrap();
        assert!(summary.contains(&vendor.id.to_string()));
        assert!(!summary.contains("password"));
    }
}
