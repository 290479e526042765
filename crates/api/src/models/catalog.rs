//! Catalog domain types: categories, products and variations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{CategoryId, Price, ProductId, VariationId, VendorId};

/// Positional image key (`image1`, `image2`, ...) to stored attachment path.
pub type ImageMap = BTreeMap<String, String>;

/// Build an [`ImageMap`] from stored paths in upload order.
#[must_use]
pub fn image_map<I>(paths: I) -> ImageMap
where
    I: IntoIterator<Item = String>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| (format!("image{}", index + 1), path))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A vendor-owned product.
///
/// The product does not store its variation ids. Variations point at their
/// product and [`ProductView`] collects them at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub vendor_id: VendorId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub vendor_id: VendorId,
    pub category_id: CategoryId,
}

/// A product together with the ids of its variations, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub variations: Vec<VariationId>,
}

/// A purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub id: VariationId,
    pub product_id: ProductId,
    pub price: Price,
    pub stock: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub images: ImageMap,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVariation {
    pub product_id: ProductId,
    pub price: Price,
    pub stock: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub images: ImageMap,
}
