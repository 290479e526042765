//! Vendor documents in `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use marketplace_core::{AccountId, VendorId};

use super::{PgStore, RepositoryError, VendorStore};
use crate::models::Vendor;

const VENDOR_COLUMNS: &str =
    "id, account_id, business_name, brand_description, brand_logo, created_at";

/// Internal row type for `PostgreSQL` vendor queries.
#[derive(Debug, sqlx::FromRow)]
struct VendorRow {
    id: VendorId,
    account_id: AccountId,
    business_name: Option<String>,
    brand_description: Option<String>,
    brand_logo: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(row: VendorRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            business_name: row.business_name,
            brand_description: row.brand_description,
            brand_logo: row.brand_logo,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl VendorStore for PgStore {
    async fn create_vendor_if_absent(
        &self,
        account_id: AccountId,
    ) -> Result<(Vendor, bool), RepositoryError> {
        // The unique index on account_id makes the insert a no-op for a
        // second caller, who then reads the winner's row.
        let sql = format!(
            "INSERT INTO vendor (id, account_id) VALUES ($1, $2) \
             ON CONFLICT (account_id) DO NOTHING \
             RETURNING {VENDOR_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, VendorRow>(&sql)
            .bind(VendorId::generate())
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = self.vendor_by_account(account_id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "vendor for account {account_id} vanished during provisioning"
            ))
        })?;
        Ok((existing, false))
    }

    async fn vendor_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendor WHERE id = $1");
        let row = sqlx::query_as::<_, VendorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn vendor_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Vendor>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendor WHERE account_id = $1");
        let row = sqlx::query_as::<_, VendorRow>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn save_vendor(&self, vendor: &Vendor) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE vendor
            SET business_name = $2, brand_description = $3, brand_logo = $4
            WHERE id = $1
            ",
        )
        .bind(vendor.id)
        .bind(vendor.business_name.as_deref())
        .bind(vendor.brand_description.as_deref())
        .bind(vendor.brand_logo.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_vendor(&self, id: VendorId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM vendor WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
