//! Document store for the marketplace.
//!
//! Every entity is read and written as a whole document, one document per
//! call. No operation spans more than one document atomically, so
//! multi-step flows (cascading deletes, variation updates) are ordered by
//! the services layer.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx. Schema lives in `crates/api/migrations/`
//!   and is applied with `cargo run -p marketplace-cli -- migrate`.
//! - [`MemoryStore`] - process-local maps, used when no database is configured
//!   and by the test suites.
//!
//! ## Tables
//!
//! - `account` - Login identities (unique email)
//! - `vendor` - Seller profiles (unique `account_id`)
//! - `category` - Product categories
//! - `product` - Vendor-owned products
//! - `variation` - Priced, image-bearing product variations

pub mod accounts;
pub mod catalog;
pub mod memory;
pub mod vendors;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketplace_core::{AccountId, CategoryId, Email, ProductId, VariationId, VendorId};

use crate::models::{
    Account, Category, NewAccount, NewProduct, NewVariation, Product, Variation, Vendor,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Account documents.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new unverified `user` account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    async fn account_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Replace a stored account. Returns `false` if it no longer exists.
    async fn save_account(&self, account: &Account) -> Result<bool, RepositoryError>;

    /// Returns `false` if nothing was deleted.
    async fn delete_account(&self, id: AccountId) -> Result<bool, RepositoryError>;
}

/// Vendor documents.
#[async_trait]
pub trait VendorStore: Send + Sync {
    /// Return the account's vendor, creating an empty one if none exists.
    ///
    /// The flag is `true` when this call created the vendor. Two concurrent
    /// calls for the same account yield the same vendor.
    async fn create_vendor_if_absent(
        &self,
        account_id: AccountId,
    ) -> Result<(Vendor, bool), RepositoryError>;

    async fn vendor_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError>;

    async fn vendor_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Vendor>, RepositoryError>;

    /// Replace a stored vendor. Returns `false` if it no longer exists.
    async fn save_vendor(&self, vendor: &Vendor) -> Result<bool, RepositoryError>;

    async fn delete_vendor(&self, id: VendorId) -> Result<bool, RepositoryError>;
}

/// Category documents.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError>;

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Returns the renamed category, or `None` if it does not exist.
    async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError>;

    /// Returns the removed category, or `None` if it did not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;
}

/// Product documents.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// All products, oldest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn save_product(&self, product: &Product) -> Result<bool, RepositoryError>;

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Variation documents.
///
/// A variation's `product_id` is the only link between the two entities.
#[async_trait]
pub trait VariationStore: Send + Sync {
    async fn insert_variation(&self, variation: NewVariation)
    -> Result<Variation, RepositoryError>;

    async fn variation_by_id(&self, id: VariationId) -> Result<Option<Variation>, RepositoryError>;

    /// All variations, oldest first.
    async fn list_variations(&self) -> Result<Vec<Variation>, RepositoryError>;

    /// Variations of one product, oldest first.
    async fn variations_of_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Variation>, RepositoryError>;

    /// Variation ids grouped by product, each list oldest first.
    ///
    /// Products without variations are absent from the map.
    async fn variation_ids_by_product(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Vec<VariationId>>, RepositoryError>;

    async fn save_variation(&self, variation: &Variation) -> Result<bool, RepositoryError>;

    async fn delete_variation(&self, id: VariationId) -> Result<bool, RepositoryError>;
}

/// The full document store.
#[async_trait]
pub trait Store: AccountStore + VendorStore + CategoryStore + ProductStore + VariationStore {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation of [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for migrations and operator tooling.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
