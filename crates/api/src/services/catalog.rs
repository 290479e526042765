//! Categories, products and variations.
//!
//! # Ownership
//!
//! Products belong to the vendor that created them. Every mutation of a
//! product or of its variations checks the caller's vendor id. A product
//! owned by someone else is reported as not found.
//!
//! # Attachments
//!
//! Image files are written to disk by the HTTP layer before a service method
//! runs, and their stored paths are handed in. If the method fails for any
//! reason those files are deleted again, so a failed request never leaves
//! files behind.

use serde::Serialize;

use marketplace_core::{CategoryId, Price, ProductId, VariationId, VendorId};

use super::uploads::UploadStore;
use super::{Result, ServiceError};
use crate::db::Store;
use crate::models::{
    Category, NewProduct, NewVariation, Product, ProductView, Variation, image_map,
};

/// Maximum number of images attached to one variation.
pub const MAX_VARIATION_IMAGES: usize = 5;

/// New product fields, already validated.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
}

/// Product changes. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// New variation fields, already validated.
#[derive(Debug, Clone)]
pub struct VariationDraft {
    pub product_id: ProductId,
    pub price: Price,
    pub stock: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Variation changes.
///
/// `None` leaves a field as it is. For `size` and `color`, an empty string
/// clears the value.
#[derive(Debug, Clone, Default)]
pub struct VariationUpdate {
    pub price: Option<Price>,
    pub stock: Option<u32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A variation whose record could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedVariation {
    pub variation_id: VariationId,
    pub error: String,
}

/// Outcome of a cascading product delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub product_id: ProductId,
    pub product_deleted: bool,
    pub deleted_variations: Vec<VariationId>,
    pub failed_variations: Vec<FailedVariation>,
    /// Files that could not be removed from disk.
    pub orphaned_files: Vec<String>,
}

impl DeletionReport {
    fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            product_deleted: false,
            deleted_variations: Vec::new(),
            failed_variations: Vec::new(),
            orphaned_files: Vec::new(),
        }
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
    uploads: &'a UploadStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, uploads: &'a UploadStore) -> Self {
        Self { store, uploads }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn add_category(&self, name: &str) -> Result<Category> {
        let category = self.store.insert_category(name).await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        self.store
            .rename_category(id, name)
            .await?
            .ok_or_else(category_not_found)
    }

    /// Delete a category. Products keep their (now dangling) category id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<Category> {
        let category = self
            .store
            .delete_category(id)
            .await?
            .ok_or_else(category_not_found)?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(category)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product for a vendor in an existing category.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn create_product(&self, vendor_id: VendorId, draft: ProductDraft) -> Result<ProductView> {
        if self.store.category_by_id(draft.category_id).await?.is_none() {
            return Err(category_not_found());
        }

        let product = self
            .store
            .insert_product(NewProduct {
                name: draft.name,
                description: draft.description,
                vendor_id,
                category_id: draft.category_id,
            })
            .await?;

        tracing::info!(product_id = %product.id, vendor_id = %vendor_id, "Product created");
        Ok(ProductView {
            product,
            variations: Vec::new(),
        })
    }

    /// Change a product's name or description.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist or
    /// belongs to another vendor.
    pub async fn update_product(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<ProductView> {
        let mut product = self.owned_product(vendor_id, product_id).await?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }

        if !self.store.save_product(&product).await? {
            return Err(product_not_found());
        }
        self.view(product).await
    }

    /// All products with their variation ids, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<ProductView>> {
        let products = self.store.list_products().await?;
        let ids: Vec<ProductId> = products.iter().map(|product| product.id).collect();
        let mut variations = self.store.variation_ids_by_product(&ids).await?;

        Ok(products
            .into_iter()
            .map(|product| {
                let variations = variations.remove(&product.id).unwrap_or_default();
                ProductView {
                    product,
                    variations,
                }
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<ProductView> {
        let product = self
            .store
            .product_by_id(id)
            .await?
            .ok_or_else(product_not_found)?;
        self.view(product).await
    }

    /// Delete a product, its variations and their image files.
    ///
    /// Files that cannot be unlinked are listed in the report but do not stop
    /// the delete. If any variation record cannot be deleted the product is
    /// kept, so the remaining variations stay reachable.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist or
    /// belongs to another vendor, and `ServiceError::PartialDeletion` with
    /// the report if some variation records could not be deleted.
    pub async fn delete_product(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
    ) -> Result<DeletionReport> {
        let product = self.owned_product(vendor_id, product_id).await?;
        let mut report = DeletionReport::new(product.id);

        for variation in self.store.variations_of_product(product.id).await? {
            let failed = self
                .uploads
                .remove_all(variation.images.values().map(String::as_str))
                .await;
            report.orphaned_files.extend(failed);

            match self.store.delete_variation(variation.id).await {
                Ok(_) => report.deleted_variations.push(variation.id),
                Err(err) => {
                    tracing::error!(
                        variation_id = %variation.id,
                        error = %err,
                        "Failed to delete variation"
                    );
                    report.failed_variations.push(FailedVariation {
                        variation_id: variation.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        if !report.failed_variations.is_empty() {
            return Err(ServiceError::PartialDeletion(report));
        }

        report.product_deleted = self.store.delete_product(product.id).await?;
        tracing::info!(
            product_id = %product.id,
            variations = report.deleted_variations.len(),
            orphaned_files = report.orphaned_files.len(),
            "Product deleted"
        );
        Ok(report)
    }

    // =========================================================================
    // Variations
    // =========================================================================

    /// All variations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_variations(&self) -> Result<Vec<Variation>> {
        Ok(self.store.list_variations().await?)
    }

    /// Add a variation with its images to one of the vendor's products.
    ///
    /// `images` are stored paths in upload order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` without images,
    /// `ServiceError::NotFound` if the product does not exist or belongs to
    /// another vendor. The images are deleted on any error.
    pub async fn add_variation(
        &self,
        vendor_id: VendorId,
        draft: VariationDraft,
        images: Vec<String>,
    ) -> Result<(ProductView, Variation)> {
        let result = self.insert_variation(vendor_id, draft, &images).await;
        if result.is_err() {
            self.discard(&images).await;
        }
        result
    }

    async fn insert_variation(
        &self,
        vendor_id: VendorId,
        draft: VariationDraft,
        images: &[String],
    ) -> Result<(ProductView, Variation)> {
        check_image_count(images)?;
        let product = self.owned_product(vendor_id, draft.product_id).await?;

        let variation = self
            .store
            .insert_variation(NewVariation {
                product_id: product.id,
                price: draft.price,
                stock: draft.stock,
                size: non_empty(draft.size),
                color: non_empty(draft.color),
                images: image_map(images.iter().cloned()),
            })
            .await?;

        tracing::info!(
            variation_id = %variation.id,
            product_id = %product.id,
            images = variation.images.len(),
            "Variation created"
        );
        let view = self.view(product).await?;
        Ok((view, variation))
    }

    /// Change a variation and replace its images.
    ///
    /// The previous image files are deleted before the new set is recorded.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` without images,
    /// `ServiceError::NotFound` if the variation does not exist or its
    /// product belongs to another vendor. The new images are deleted on any
    /// error.
    pub async fn update_variation(
        &self,
        vendor_id: VendorId,
        variation_id: VariationId,
        update: VariationUpdate,
        images: Vec<String>,
    ) -> Result<Variation> {
        let result = self
            .replace_variation(vendor_id, variation_id, update, &images)
            .await;
        if result.is_err() {
            self.discard(&images).await;
        }
        result
    }

    async fn replace_variation(
        &self,
        vendor_id: VendorId,
        variation_id: VariationId,
        update: VariationUpdate,
        images: &[String],
    ) -> Result<Variation> {
        check_image_count(images)?;
        let mut variation = self
            .store
            .variation_by_id(variation_id)
            .await?
            .ok_or_else(variation_not_found)?;
        self.owned_product(vendor_id, variation.product_id).await?;

        let previous = std::mem::take(&mut variation.images);
        self.uploads
            .remove_all(previous.values().map(String::as_str))
            .await;

        if let Some(price) = update.price {
            variation.price = price;
        }
        if let Some(stock) = update.stock {
            variation.stock = stock;
        }
        if let Some(size) = update.size {
            variation.size = non_empty(Some(size));
        }
        if let Some(color) = update.color {
            variation.color = non_empty(Some(color));
        }
        variation.images = image_map(images.iter().cloned());

        if !self.store.save_variation(&variation).await? {
            return Err(variation_not_found());
        }
        tracing::info!(variation_id = %variation.id, "Variation updated");
        Ok(variation)
    }

    /// Delete one variation of one of the vendor's products.
    ///
    /// Returns the product as it is afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product or variation does not
    /// exist, the variation belongs to a different product, or the product
    /// belongs to another vendor.
    pub async fn delete_variation(
        &self,
        vendor_id: VendorId,
        product_id: ProductId,
        variation_id: VariationId,
    ) -> Result<ProductView> {
        let product = self.owned_product(vendor_id, product_id).await?;
        let variation = self
            .store
            .variation_by_id(variation_id)
            .await?
            .filter(|variation| variation.product_id == product.id)
            .ok_or_else(variation_not_found)?;

        self.uploads
            .remove_all(variation.images.values().map(String::as_str))
            .await;
        if !self.store.delete_variation(variation.id).await? {
            return Err(variation_not_found());
        }

        tracing::info!(variation_id = %variation.id, product_id = %product.id, "Variation deleted");
        self.view(product).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn owned_product(&self, vendor_id: VendorId, product_id: ProductId) -> Result<Product> {
        self.store
            .product_by_id(product_id)
            .await?
            .filter(|product| product.vendor_id == vendor_id)
            .ok_or_else(product_not_found)
    }

    async fn view(&self, product: Product) -> Result<ProductView> {
        let mut grouped = self.store.variation_ids_by_product(&[product.id]).await?;
        let variations = grouped.remove(&product.id).unwrap_or_default();
        Ok(ProductView {
            product,
            variations,
        })
    }

    async fn discard(&self, images: &[String]) {
        if images.is_empty() {
            return;
        }
        let failed = self.uploads.remove_all(images.iter().map(String::as_str)).await;
        tracing::debug!(
            received = images.len(),
            failed = failed.len(),
            "Discarded images of failed request"
        );
    }
}

fn check_image_count(images: &[String]) -> Result<()> {
    if images.is_empty() {
        return Err(ServiceError::invalid("image", "at least one image is required"));
    }
    if images.len() > MAX_VARIATION_IMAGES {
        return Err(ServiceError::invalid("image", "at most 5 images are allowed"));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn category_not_found() -> ServiceError {
    ServiceError::NotFound("category not found".to_string())
}

fn product_not_found() -> ServiceError {
    ServiceError::NotFound("product not found".to_string())
}

fn variation_not_found() -> ServiceError {
    ServiceError::NotFound("variation not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{
        AccountStore, CategoryStore, MemoryStore, ProductStore, RepositoryError, VariationStore,
        VendorStore,
    };
    use crate::models::{Account, NewAccount, Vendor};
    use marketplace_core::{AccountId, Email, UploadFolder};

    struct Fixture {
        store: MemoryStore,
        uploads: UploadStore,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                store: MemoryStore::new(),
                uploads: UploadStore::new(dir.path()),
                _dir: dir,
            }
        }

        fn service(&self) -> CatalogService<'_> {
            CatalogService::new(&self.store, &self.uploads)
        }

        async fn product(&self, vendor_id: VendorId) -> ProductId {
            let category = self.service().add_category("Kitchen").await.unwrap();
            self.service()
                .create_product(
                    vendor_id,
                    ProductDraft {
                        name: "Mug".to_string(),
                        description: "Ceramic".to_string(),
                        category_id: category.id,
                    },
                )
                .await
                .unwrap()
                .product
                .id
        }

        async fn images(&self, count: usize) -> Vec<String> {
            let mut stored = Vec::new();
            for _ in 0..count {
                stored.push(
                    self.uploads
                        .write(UploadFolder::ProductImage, Some("p.png"), b"png")
                        .await
                        .unwrap(),
                );
            }
            stored
        }

        async fn variation(&self, vendor_id: VendorId, product_id: ProductId) -> Variation {
            let images = self.images(2).await;
            self.service()
                .add_variation(vendor_id, draft(product_id), images)
                .await
                .unwrap()
                .1
        }
    }

    fn draft(product_id: ProductId) -> VariationDraft {
        VariationDraft {
            product_id,
            price: Price::new(Decimal::new(1999, 2)).unwrap(),
            stock: 3,
            size: Some("M".to_string()),
            color: None,
        }
    }

    #[tokio::test]
    async fn test_create_product_requires_category() {
        let fx = Fixture::new();
        let result = fx
            .service()
            .create_product(
                VendorId::generate(),
                ProductDraft {
                    name: "Mug".to_string(),
                    description: "Ceramic".to_string(),
                    category_id: CategoryId::generate(),
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_variation_links_product_and_images() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let product_id = fx.product(vendor_id).await;
        let images = fx.images(2).await;

        let (view, variation) = fx
            .service()
            .add_variation(vendor_id, draft(product_id), images.clone())
            .await
            .unwrap();

        assert_eq!(view.variations, vec![variation.id]);
        assert_eq!(variation.product_id, product_id);
        assert_eq!(variation.images["image1"], images[0]);
        assert_eq!(variation.images["image2"], images[1]);
        assert_eq!(variation.size.as_deref(), Some("M"));
    }

    #[tokio::test]
    async fn test_add_variation_to_foreign_product_discards_images() {
        let fx = Fixture::new();
        let product_id = fx.product(VendorId::generate()).await;
        let images = fx.images(1).await;

        let result = fx
            .service()
            .add_variation(VendorId::generate(), draft(product_id), images.clone())
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(!fx.uploads.exists(&images[0]).await);
        assert!(fx.store.list_variations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_variation_requires_an_image() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let product_id = fx.product(vendor_id).await;

        let result = fx
            .service()
            .add_variation(vendor_id, draft(product_id), Vec::new())
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_variation_replaces_images() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let product_id = fx.product(vendor_id).await;
        let original = fx.variation(vendor_id, product_id).await;
        let replacement = fx.images(1).await;

        let updated = fx
            .service()
            .update_variation(
                vendor_id,
                original.id,
                VariationUpdate {
                    stock: Some(7),
                    size: Some(String::new()),
                    ..VariationUpdate::default()
                },
                replacement.clone(),
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, 7);
        assert_eq!(updated.price, original.price);
        assert!(updated.size.is_none());
        assert_eq!(updated.images.len(), 1);
        assert_eq!(updated.images["image1"], replacement[0]);
        for old in original.images.values() {
            assert!(!fx.uploads.exists(old).await);
        }
        assert!(fx.uploads.exists(&replacement[0]).await);
    }

    #[tokio::test]
    async fn test_delete_variation_checks_parent() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let first = fx.product(vendor_id).await;
        let second = fx.product(vendor_id).await;
        let variation = fx.variation(vendor_id, first).await;

        let wrong_parent = fx
            .service()
            .delete_variation(vendor_id, second, variation.id)
            .await;
        assert!(matches!(wrong_parent, Err(ServiceError::NotFound(_))));

        let view = fx
            .service()
            .delete_variation(vendor_id, first, variation.id)
            .await
            .unwrap();
        assert!(view.variations.is_empty());
        for path in variation.images.values() {
            assert!(!fx.uploads.exists(path).await);
        }
    }

    #[tokio::test]
    async fn test_delete_product_cascades() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let product_id = fx.product(vendor_id).await;
        let a = fx.variation(vendor_id, product_id).await;
        let b = fx.variation(vendor_id, product_id).await;

        // One file already gone from disk.
        let missing = a.images["image1"].clone();
        fx.uploads.remove(&missing).await.unwrap();

        let report = fx
            .service()
            .delete_product(vendor_id, product_id)
            .await
            .unwrap();

        assert!(report.product_deleted);
        assert_eq!(report.deleted_variations, vec![a.id, b.id]);
        assert_eq!(report.orphaned_files, vec![missing]);
        assert!(fx.store.list_variations().await.unwrap().is_empty());
        assert!(matches!(
            fx.service().product(product_id).await,
            Err(ServiceError::NotFound(_))
        ));
        for path in b.images.values() {
            assert!(!fx.uploads.exists(path).await);
        }
    }

    #[tokio::test]
    async fn test_delete_foreign_product_is_not_found() {
        let fx = Fixture::new();
        let product_id = fx.product(VendorId::generate()).await;

        let result = fx
            .service()
            .delete_product(VendorId::generate(), product_id)
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(fx.service().product(product_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_products_includes_variation_ids() {
        let fx = Fixture::new();
        let vendor_id = VendorId::generate();
        let first = fx.product(vendor_id).await;
        let second = fx.product(vendor_id).await;
        let variation = fx.variation(vendor_id, second).await;

        let products = fx.service().list_products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product.id, first);
        assert!(products[0].variations.is_empty());
        assert_eq!(products[1].variations, vec![variation.id]);
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let fx = Fixture::new();
        let service = fx.service();
        let category = service.add_category("Garden").await.unwrap();

        let renamed = service.rename_category(category.id, "Outdoor").await.unwrap();
        assert_eq!(renamed.name, "Outdoor");

        service.delete_category(category.id).await.unwrap();
        assert!(service.list_categories().await.unwrap().is_empty());
        assert!(matches!(
            service.delete_category(category.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    /// A store whose variation deletes always fail.
    struct StuckVariations(MemoryStore);

    #[async_trait]
    impl AccountStore for StuckVariations {
        async fn insert_account(&self, account: NewAccount) -> std::result::Result<Account, RepositoryError> {
            self.0.insert_account(account).await
        }
        async fn account_by_id(&self, id: AccountId) -> std::result::Result<Option<Account>, RepositoryError> {
            self.0.account_by_id(id).await
        }
        async fn account_by_email(&self, email: &Email) -> std::result::Result<Option<Account>, RepositoryError> {
            self.0.account_by_email(email).await
        }
        async fn save_account(&self, account: &Account) -> std::result::Result<bool, RepositoryError> {
            self.0.save_account(account).await
        }
        async fn delete_account(&self, id: AccountId) -> std::result::Result<bool, RepositoryError> {
            self.0.delete_account(id).await
        }
    }

    #[async_trait]
    impl VendorStore for StuckVariations {
        async fn create_vendor_if_absent(
            &self,
            account_id: AccountId,
        ) -> std::result::Result<(Vendor, bool), RepositoryError> {
            self.0.create_vendor_if_absent(account_id).await
        }
        async fn vendor_by_id(&self, id: VendorId) -> std::result::Result<Option<Vendor>, RepositoryError> {
            self.0.vendor_by_id(id).await
        }
        async fn vendor_by_account(
            &self,
            account_id: AccountId,
        ) -> std::result::Result<Option<Vendor>, RepositoryError> {
            self.0.vendor_by_account(account_id).await
        }
        async fn save_vendor(&self, vendor: &Vendor) -> std::result::Result<bool, RepositoryError> {
            self.0.save_vendor(vendor).await
        }
        async fn delete_vendor(&self, id: VendorId) -> std::result::Result<bool, RepositoryError> {
            self.0.delete_vendor(id).await
        }
    }

    #[async_trait]
    impl CategoryStore for StuckVariations {
        async fn insert_category(&self, name: &str) -> std::result::Result<Category, RepositoryError> {
            self.0.insert_category(name).await
        }
        async fn category_by_id(&self, id: CategoryId) -> std::result::Result<Option<Category>, RepositoryError> {
            self.0.category_by_id(id).await
        }
        async fn list_categories(&self) -> std::result::Result<Vec<Category>, RepositoryError> {
            self.0.list_categories().await
        }
        async fn rename_category(
            &self,
            id: CategoryId,
            name: &str,
        ) -> std::result::Result<Option<Category>, RepositoryError> {
            self.0.rename_category(id, name).await
        }
        async fn delete_category(&self, id: CategoryId) -> std::result::Result<Option<Category>, RepositoryError> {
            self.0.delete_category(id).await
        }
    }

    #[async_trait]
    impl ProductStore for StuckVariations {
        async fn insert_product(&self, product: NewProduct) -> std::result::Result<Product, RepositoryError> {
            self.0.insert_product(product).await
        }
        async fn product_by_id(&self, id: ProductId) -> std::result::Result<Option<Product>, RepositoryError> {
            self.0.product_by_id(id).await
        }
        async fn list_products(&self) -> std::result::Result<Vec<Product>, RepositoryError> {
            self.0.list_products().await
        }
        async fn save_product(&self, product: &Product) -> std::result::Result<bool, RepositoryError> {
            self.0.save_product(product).await
        }
        async fn delete_product(&self, id: ProductId) -> std::result::Result<bool, RepositoryError> {
            self.0.delete_product(id).await
        }
    }

    #[async_trait]
    impl VariationStore for StuckVariations {
        async fn insert_variation(
            &self,
            variation: NewVariation,
        ) -> std::result::Result<Variation, RepositoryError> {
            self.0.insert_variation(variation).await
        }
        async fn variation_by_id(&self, id: VariationId) -> std::result::Result<Option<Variation>, RepositoryError> {
            self.0.variation_by_id(id).await
        }
        async fn list_variations(&self) -> std::result::Result<Vec<Variation>, RepositoryError> {
            self.0.list_variations().await
        }
        async fn variations_of_product(
            &self,
            product_id: ProductId,
        ) -> std::result::Result<Vec<Variation>, RepositoryError> {
            self.0.variations_of_product(product_id).await
        }
        async fn variation_ids_by_product(
            &self,
            product_ids: &[ProductId],
        ) -> std::result::Result<HashMap<ProductId, Vec<VariationId>>, RepositoryError> {
            self.0.variation_ids_by_product(product_ids).await
        }
        async fn save_variation(&self, variation: &Variation) -> std::result::Result<bool, RepositoryError> {
            self.0.save_variation(variation).await
        }
        async fn delete_variation(&self, _id: VariationId) -> std::result::Result<bool, RepositoryError> {
            Err(RepositoryError::DataCorruption("disk full".to_string()))
        }
    }

    #[async_trait]
    impl Store for StuckVariations {
        async fn ping(&self) -> std::result::Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delete_product_keeps_product_when_variation_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = StuckVariations(MemoryStore::new());
        let uploads = UploadStore::new(dir.path());
        let service = CatalogService::new(&store, &uploads);
        let vendor_id = VendorId::generate();

        let category = service.add_category("Kitchen").await.unwrap();
        let product = service
            .create_product(
                vendor_id,
                ProductDraft {
                    name: "Mug".to_string(),
                    description: "Ceramic".to_string(),
                    category_id: category.id,
                },
            )
            .await
            .unwrap();
        let image = uploads
            .write(UploadFolder::ProductImage, Some("p.png"), b"png")
            .await
            .unwrap();
        let (_, variation) = service
            .add_variation(vendor_id, draft(product.product.id), vec![image])
            .await
            .unwrap();

        let Err(ServiceError::PartialDeletion(report)) =
            service.delete_product(vendor_id, product.product.id).await
        else {
            panic!("expected a partial deletion");
        };
        assert!(!report.product_deleted);
        assert_eq!(report.failed_variations[0].variation_id, variation.id);

        let remaining = service.product(product.product.id).await.unwrap();
        assert_eq!(remaining.variations, vec![variation.id]);
    }
}
