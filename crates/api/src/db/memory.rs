//! In-memory implementation of the document store.
//!
//! Each collection sits behind its own `RwLock`. Uniqueness rules (account
//! email, one vendor per account) are checked and applied under a single
//! write guard, so they hold under concurrent requests just like the
//! unique indexes do in `PostgreSQL`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use marketplace_core::{AccountId, AccountKind, CategoryId, Email, ProductId, VariationId, VendorId};

use super::{
    AccountStore, CategoryStore, ProductStore, RepositoryError, Store, VariationStore,
    VendorStore,
};
use crate::models::{
    Account, Category, NewAccount, NewProduct, NewVariation, Product, Variation, Vendor,
};

/// A stored document plus its insertion sequence number, used for ordering.
#[derive(Debug, Clone)]
struct Entry<T> {
    seq: u64,
    doc: T,
}

/// Process-local [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    accounts: RwLock<HashMap<AccountId, Entry<Account>>>,
    vendors: RwLock<HashMap<VendorId, Entry<Vendor>>>,
    categories: RwLock<HashMap<CategoryId, Entry<Category>>>,
    products: RwLock<HashMap<ProductId, Entry<Product>>>,
    variations: RwLock<HashMap<VariationId, Entry<Variation>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn entry<T>(&self, doc: T) -> Entry<T> {
        Entry {
            seq: self.next_seq(),
            doc,
        }
    }
}

/// Clone documents out of a map, oldest first.
fn ordered<'a, T, I>(entries: I) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a Entry<T>>,
{
    let mut entries: Vec<&Entry<T>> = entries.collect();
    entries.sort_by_key(|entry| entry.seq);
    entries.into_iter().map(|entry| entry.doc.clone()).collect()
}

/// Replace the document stored under `id`, keeping its sequence number.
fn replace<K, T>(map: &mut HashMap<K, Entry<T>>, id: &K, doc: &T) -> bool
where
    K: std::hash::Hash + Eq,
    T: Clone,
{
    match map.get_mut(id) {
        Some(entry) => {
            entry.doc = doc.clone();
            true
        }
        None => false,
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|e| e.doc.email == account.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let created = Account {
            id: AccountId::generate(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            kind: AccountKind::User,
            is_verified: false,
            verification_code: None,
            reset_code: None,
            reset_expires_at: None,
            created_at: Utc::now(),
        };
        accounts.insert(created.id, self.entry(created.clone()));
        Ok(created)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.read().await.get(&id).map(|e| e.doc.clone()))
    }

    async fn account_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|e| &e.doc.email == email)
            .map(|e| e.doc.clone()))
    }

    async fn save_account(&self, account: &Account) -> Result<bool, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|e| e.doc.id != account.id && e.doc.email == account.email)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        Ok(replace(&mut accounts, &account.id, account))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl VendorStore for MemoryStore {
    async fn create_vendor_if_absent(
        &self,
        account_id: AccountId,
    ) -> Result<(Vendor, bool), RepositoryError> {
        let mut vendors = self.vendors.write().await;
        if let Some(existing) = vendors.values().find(|e| e.doc.account_id == account_id) {
            return Ok((existing.doc.clone(), false));
        }

        let vendor = Vendor::empty(account_id);
        vendors.insert(vendor.id, self.entry(vendor.clone()));
        Ok((vendor, true))
    }

    async fn vendor_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        Ok(self.vendors.read().await.get(&id).map(|e| e.doc.clone()))
    }

    async fn vendor_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Vendor>, RepositoryError> {
        let vendors = self.vendors.read().await;
        Ok(vendors
            .values()
            .find(|e| e.doc.account_id == account_id)
            .map(|e| e.doc.clone()))
    }

    async fn save_vendor(&self, vendor: &Vendor) -> Result<bool, RepositoryError> {
        Ok(replace(&mut *self.vendors.write().await, &vendor.id, vendor))
    }

    async fn delete_vendor(&self, id: VendorId) -> Result<bool, RepositoryError> {
        Ok(self.vendors.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let category = Category {
            id: CategoryId::generate(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.categories
            .write()
            .await
            .insert(category.id, self.entry(category.clone()));
        Ok(category)
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.categories.read().await.get(&id).map(|e| e.doc.clone()))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(ordered(self.categories.read().await.values()))
    }

    async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let mut categories = self.categories.write().await;
        Ok(categories.get_mut(&id).map(|entry| {
            name.clone_into(&mut entry.doc.name);
            entry.doc.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.categories.write().await.remove(&id).map(|e| e.doc))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let product = Product {
            id: ProductId::generate(),
            name: product.name,
            description: product.description,
            vendor_id: product.vendor_id,
            category_id: product.category_id,
            created_at: Utc::now(),
        };
        self.products
            .write()
            .await
            .insert(product.id, self.entry(product.clone()));
        Ok(product)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).map(|e| e.doc.clone()))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(ordered(self.products.read().await.values()))
    }

    async fn save_product(&self, product: &Product) -> Result<bool, RepositoryError> {
        Ok(replace(&mut *self.products.write().await, &product.id, product))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl VariationStore for MemoryStore {
    async fn insert_variation(
        &self,
        variation: NewVariation,
    ) -> Result<Variation, RepositoryError> {
        let variation = Variation {
            id: VariationId::generate(),
            product_id: variation.product_id,
            price: variation.price,
            stock: variation.stock,
            size: variation.size,
            color: variation.color,
            images: variation.images,
            created_at: Utc::now(),
        };
        self.variations
            .write()
            .await
            .insert(variation.id, self.entry(variation.clone()));
        Ok(variation)
    }

    async fn variation_by_id(&self, id: VariationId) -> Result<Option<Variation>, RepositoryError> {
        Ok(self.variations.read().await.get(&id).map(|e| e.doc.clone()))
    }

    async fn list_variations(&self) -> Result<Vec<Variation>, RepositoryError> {
        Ok(ordered(self.variations.read().await.values()))
    }

    async fn variations_of_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Variation>, RepositoryError> {
        let variations = self.variations.read().await;
        Ok(ordered(
            variations.values().filter(|e| e.doc.product_id == product_id),
        ))
    }

    async fn variation_ids_by_product(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Vec<VariationId>>, RepositoryError> {
        let variations = self.variations.read().await;
        let matching = variations
            .values()
            .filter(|e| product_ids.contains(&e.doc.product_id));

        let mut grouped: HashMap<ProductId, Vec<VariationId>> = HashMap::new();
        for variation in ordered(matching) {
            grouped
                .entry(variation.product_id)
                .or_default()
                .push(variation.id);
        }
        Ok(grouped)
    }

    async fn save_variation(&self, variation: &Variation) -> Result<bool, RepositoryError> {
        Ok(replace(
            &mut *self.variations.write().await,
            &variation.id,
            variation,
        ))
    }

    async fn delete_variation(&self, id: VariationId) -> Result<bool, RepositoryError> {
        Ok(self.variations.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::image_map;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "A".to_string(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_account(new_account("a@x.com")).await.unwrap();

        let err = store.insert_account(new_account("A@X.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_vendor_if_absent_is_idempotent_under_concurrency() {
        let store = Arc::new(MemoryStore::new());
        let account_id = store.insert_account(new_account("v@x.com")).await.unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_vendor_if_absent(account_id).await })
            })
            .collect();

        let mut created = 0;
        let mut ids = Vec::new();
        for handle in handles {
            let (vendor, was_created) = handle.await.unwrap().unwrap();
            if was_created {
                created += 1;
            }
            ids.push(vendor.id);
        }

        assert_eq!(created, 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test]
    async fn test_variation_ids_are_grouped_oldest_first() {
        let store = MemoryStore::new();
        let product = store
            .insert_product(NewProduct {
                name: "Mug".to_string(),
                description: "Ceramic".to_string(),
                vendor_id: VendorId::generate(),
                category_id: CategoryId::generate(),
            })
            .await
            .unwrap();

        let mut expected = Vec::new();
        for stock in 0..3 {
            let variation = store
                .insert_variation(NewVariation {
                    product_id: product.id,
                    price: "1.00".parse().unwrap(),
                    stock,
                    size: None,
                    color: None,
                    images: image_map(vec![format!("productImage/{stock}.png")]),
                })
                .await
                .unwrap();
            expected.push(variation.id);
        }

        let grouped = store.variation_ids_by_product(&[product.id]).await.unwrap();
        assert_eq!(grouped[&product.id], expected);

        store.delete_variation(expected[1]).await.unwrap();
        let grouped = store.variation_ids_by_product(&[product.id]).await.unwrap();
        assert_eq!(grouped[&product.id], vec![expected[0], expected[2]]);
    }

    #[tokio::test]
    async fn test_save_missing_document_reports_false() {
        let store = MemoryStore::new();
        let vendor = Vendor::empty(AccountId::generate());
        assert!(!store.save_vendor(&vendor).await.unwrap());
    }
}
