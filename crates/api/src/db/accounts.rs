//! Account documents in `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use marketplace_core::{AccountId, AccountKind, Email};

use super::{AccountStore, PgStore, RepositoryError, map_unique_violation};
use crate::models::{Account, NewAccount};

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, kind, is_verified, \
     verification_code, reset_code, reset_expires_at, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    name: String,
    email: String,
    password_hash: String,
    kind: String,
    is_verified: bool,
    verification_code: Option<String>,
    reset_code: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let kind = row.kind.parse::<AccountKind>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid account kind in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            password_hash: row.password_hash,
            kind,
            is_verified: row.is_verified,
            verification_code: row.verification_code,
            reset_code: row.reset_code,
            reset_expires_at: row.reset_expires_at,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO account (id, name, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(AccountId::generate())
            .bind(&account.name)
            .bind(account.email.as_str())
            .bind(&account.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email"))?;

        row.try_into()
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn account_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn save_account(&self, account: &Account) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE account
            SET name = $2, email = $3, password_hash = $4, kind = $5, is_verified = $6,
                verification_code = $7, reset_code = $8, reset_expires_at = $9
            WHERE id = $1
            ",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(account.kind.as_str())
        .bind(account.is_verified)
        .bind(account.verification_code.as_deref())
        .bind(account.reset_code.as_deref())
        .bind(account.reset_expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
