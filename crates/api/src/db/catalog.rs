//! Category, product and variation documents in `PostgreSQL`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use marketplace_core::{CategoryId, Price, ProductId, VariationId, VendorId};

use super::{CategoryStore, PgStore, ProductStore, RepositoryError, VariationStore};
use crate::models::{
    Category, ImageMap, NewProduct, NewVariation, Product, Variation,
};

const CATEGORY_COLUMNS: &str = "id, name, created_at";
const PRODUCT_COLUMNS: &str = "id, name, description, vendor_id, category_id, created_at";
const VARIATION_COLUMNS: &str =
    "id, product_id, price, stock, size, color, images, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    vendor_id: VendorId,
    category_id: CategoryId,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            vendor_id: row.vendor_id,
            category_id: row.category_id,
            created_at: row.created_at,
        }
    }
}

/// Internal row type for `PostgreSQL` variation queries.
#[derive(Debug, sqlx::FromRow)]
struct VariationRow {
    id: VariationId,
    product_id: ProductId,
    price: Decimal,
    stock: i32,
    size: Option<String>,
    color: Option<String>,
    images: Json<ImageMap>,
    created_at: DateTime<Utc>,
}

impl TryFrom<VariationRow> for Variation {
    type Error = RepositoryError;

    fn try_from(row: VariationRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid stock in database: {}", row.stock))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            price,
            stock,
            size: row.size,
            color: row.color,
            images: row.images.0,
            created_at: row.created_at,
        })
    }
}

fn stock_column(stock: u32) -> Result<i32, RepositoryError> {
    i32::try_from(stock)
        .map_err(|_| RepositoryError::Conflict(format!("stock {stock} exceeds storage range")))
}

// =============================================================================
// Categories
// =============================================================================

#[async_trait]
impl CategoryStore for PgStore {
    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let sql = format!(
            "INSERT INTO category (id, name) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(CategoryId::generate())
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM category WHERE id = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM category ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let sql =
            format!("UPDATE category SET name = $2 WHERE id = $1 RETURNING {CATEGORY_COLUMNS}");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("DELETE FROM category WHERE id = $1 RETURNING {CATEGORY_COLUMNS}");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO product (id, name, description, vendor_id, category_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ProductId::generate())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.vendor_id)
            .bind(product.category_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product ORDER BY seq");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_product(&self, product: &Product) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE product
            SET name = $2, description = $3, category_id = $4
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Variations
// =============================================================================

#[async_trait]
impl VariationStore for PgStore {
    async fn insert_variation(
        &self,
        variation: NewVariation,
    ) -> Result<Variation, RepositoryError> {
        let sql = format!(
            "INSERT INTO variation (id, product_id, price, stock, size, color, images) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {VARIATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VariationRow>(&sql)
            .bind(VariationId::generate())
            .bind(variation.product_id)
            .bind(variation.price.amount())
            .bind(stock_column(variation.stock)?)
            .bind(variation.size.as_deref())
            .bind(variation.color.as_deref())
            .bind(Json(&variation.images))
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn variation_by_id(&self, id: VariationId) -> Result<Option<Variation>, RepositoryError> {
        let sql = format!("SELECT {VARIATION_COLUMNS} FROM variation WHERE id = $1");
        let row = sqlx::query_as::<_, VariationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_variations(&self) -> Result<Vec<Variation>, RepositoryError> {
        let sql = format!("SELECT {VARIATION_COLUMNS} FROM variation ORDER BY seq");
        let rows = sqlx::query_as::<_, VariationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn variations_of_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Variation>, RepositoryError> {
        let sql = format!(
            "SELECT {VARIATION_COLUMNS} FROM variation WHERE product_id = $1 ORDER BY seq"
        );
        let rows = sqlx::query_as::<_, VariationRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn variation_ids_by_product(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Vec<VariationId>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<Uuid> = product_ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query_as::<_, (ProductId, VariationId)>(
            "SELECT product_id, id FROM variation WHERE product_id = ANY($1) ORDER BY seq",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<ProductId, Vec<VariationId>> = HashMap::new();
        for (product_id, variation_id) in rows {
            grouped.entry(product_id).or_default().push(variation_id);
        }
        Ok(grouped)
    }

    async fn save_variation(&self, variation: &Variation) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE variation
            SET price = $2, stock = $3, size = $4, color = $5, images = $6
            WHERE id = $1
            ",
        )
        .bind(variation.id)
        .bind(variation.price.amount())
        .bind(stock_column(variation.stock)?)
        .bind(variation.size.as_deref())
        .bind(variation.color.as_deref())
        .bind(Json(&variation.images))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_variation(&self, id: VariationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM variation WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
