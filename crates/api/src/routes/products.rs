//! Catalog routes, mounted at `/api/product`.
//!
//! Reads are public. Every mutation needs a vendor session, and product and
//! variation mutations are limited to the vendor's own products.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use marketplace_core::{CategoryId, Price, ProductId, VariationId};

use super::extract::{self, Checks, PRODUCT_IMAGES, Received, Validate, ValidJson};
use super::parse_id;
use crate::error::Result;
use crate::middleware::VendorSession;
use crate::models::{Category, ProductView, Variation};
use crate::services::catalog::{
    DeletionReport, ProductDraft, ProductUpdate, VariationDraft, VariationUpdate,
};
use crate::services::uploads::UploadStore;
use crate::services::{FieldError, ServiceError};
use crate::state::AppState;

const STOCK_MESSAGE: &str = "must be a whole number between 0 and 2147483647";
const PRICE_MESSAGE: &str = "must be a non-negative number";

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub category_id: String,
}

impl Validate for CreateProductRequest {
    type Valid = ProductDraft;

    fn validate(self) -> std::result::Result<ProductDraft, Vec<FieldError>> {
        let mut checks = Checks::new();
        let name = checks.required("name", &self.name);
        let description = checks.required("description", &self.description);
        let category_id = checks.required("categoryId", &self.category_id);
        checks.finish(|| {
            Some(ProductDraft {
                name,
                description,
                // Unparseable ids are resolved later and reported as not found.
                category_id: CategoryId::parse(&category_id).unwrap_or_else(|_| CategoryId::nil()),
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProductRequest {
    pub name: String,
    pub description: String,
}

impl Validate for UpdateProductRequest {
    type Valid = ProductUpdate;

    fn validate(self) -> std::result::Result<ProductUpdate, Vec<FieldError>> {
        let mut checks = Checks::new();
        let name = checks.required("name", &self.name);
        let description = checks.required("description", &self.description);
        checks.finish(|| {
            Some(ProductUpdate {
                name: Some(name),
                description: Some(description),
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryRequest {
    pub name: String,
}

impl Validate for CategoryRequest {
    type Valid = String;

    fn validate(self) -> std::result::Result<String, Vec<FieldError>> {
        let mut checks = Checks::new();
        let name = checks.required("name", &self.name);
        checks.finish(|| Some(name))
    }
}

#[derive(Debug, Serialize)]
pub struct AddVariationResponse {
    pub product: ProductView,
    pub variation: Variation,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub message: &'static str,
    pub report: DeletionReport,
}

// =============================================================================
// Multipart Forms
// =============================================================================

fn parse_stock(checks: &mut Checks, raw: Option<&str>) -> Option<u32> {
    let stock: u32 = checks.parse("stock", raw, STOCK_MESSAGE)?;
    if i32::try_from(stock).is_err() {
        checks.fail("stock", STOCK_MESSAGE);
        return None;
    }
    Some(stock)
}

fn variation_draft(form: &Received) -> std::result::Result<VariationDraft, ServiceError> {
    let mut checks = Checks::new();
    let product_id = checks.required("productId", form.field("productId").unwrap_or_default());
    let price: Option<Price> = checks.parse("price", form.field("price"), PRICE_MESSAGE);
    let stock = parse_stock(&mut checks, form.field("stock"));

    let draft = checks.finish(|| {
        Some(VariationDraft {
            product_id: ProductId::parse(&product_id).unwrap_or_else(|_| ProductId::nil()),
            price: price?,
            stock: stock?,
            size: form.field("size").map(str::to_string),
            color: form.field("color").map(str::to_string),
        })
    });
    draft.map_err(ServiceError::Validation)
}

fn variation_update(form: &Received) -> std::result::Result<(VariationId, VariationUpdate), ServiceError> {
    let mut checks = Checks::new();
    let variation_id = checks.required("variationId", form.field("variationId").unwrap_or_default());

    let present = |name: &str| form.field(name).filter(|value| !value.trim().is_empty());
    let price = match present("price") {
        Some(raw) => checks.parse::<Price>("price", Some(raw), PRICE_MESSAGE),
        None => None,
    };
    let stock = match present("stock") {
        Some(raw) => parse_stock(&mut checks, Some(raw)),
        None => None,
    };

    let update = checks.finish(|| {
        Some((
            VariationId::parse(&variation_id).unwrap_or_else(|_| VariationId::nil()),
            VariationUpdate {
                price,
                stock,
                size: form.field("size").map(str::to_string),
                color: form.field("color").map(str::to_string),
            },
        ))
    });
    update.map_err(ServiceError::Validation)
}

/// Delete received files and pass the error on.
async fn discard<T>(uploads: &UploadStore, form: &Received, err: ServiceError) -> Result<T> {
    uploads.remove_all(form.files.iter().map(String::as_str)).await;
    Err(err.into())
}

// =============================================================================
// Products
// =============================================================================

/// POST /api/product/create
pub async fn create(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    ValidJson(draft): ValidJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let product = state.catalog().create_product(vendor_id, draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /api/product/update/{productId}
pub async fn update(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    Path(product_id): Path<String>,
    ValidJson(update): ValidJson<UpdateProductRequest>,
) -> Result<Json<ProductView>> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let product = state
        .catalog()
        .update_product(vendor_id, product_id, update)
        .await?;
    Ok(Json(product))
}

/// GET /api/product/get-all
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(state.catalog().list_products().await?))
}

/// GET /api/product/get/{productId}
pub async fn get(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductView>> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    Ok(Json(state.catalog().product(product_id).await?))
}

/// DELETE /api/product/delete/{productId}
pub async fn delete(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    Path(product_id): Path<String>,
) -> Result<Json<DeleteProductResponse>> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let report = state.catalog().delete_product(vendor_id, product_id).await?;
    Ok(Json(DeleteProductResponse {
        message: "Product deleted",
        report,
    }))
}

// =============================================================================
// Variations
// =============================================================================

/// POST /api/product/add-variation
///
/// Multipart body: `productId`, `price`, `stock`, optional `size` and
/// `color`, and one to five `image` files.
pub async fn add_variation(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AddVariationResponse>)> {
    let form = extract::receive(multipart, state.uploads(), PRODUCT_IMAGES).await?;
    let draft = match variation_draft(&form) {
        Ok(draft) => draft,
        Err(err) => return discard(state.uploads(), &form, err).await,
    };

    let (product, variation) = state
        .catalog()
        .add_variation(vendor_id, draft, form.files)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AddVariationResponse { product, variation }),
    ))
}

/// PATCH /api/product/update-variation
///
/// Multipart body: `variationId`, optional `price`, `stock`, `size` and
/// `color`, and one to five `image` files that replace the current ones.
pub async fn update_variation(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    multipart: Multipart,
) -> Result<Json<Variation>> {
    let form = extract::receive(multipart, state.uploads(), PRODUCT_IMAGES).await?;
    let (variation_id, update) = match variation_update(&form) {
        Ok(parsed) => parsed,
        Err(err) => return discard(state.uploads(), &form, err).await,
    };

    let variation = state
        .catalog()
        .update_variation(vendor_id, variation_id, update, form.files)
        .await?;
    Ok(Json(variation))
}

/// DELETE /api/product/delete-variation/{productId}/{variationId}
pub async fn delete_variation(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    Path((product_id, variation_id)): Path<(String, String)>,
) -> Result<Json<ProductView>> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let variation_id: VariationId = parse_id(&variation_id, "variation")?;
    let product = state
        .catalog()
        .delete_variation(vendor_id, product_id, variation_id)
        .await?;
    Ok(Json(product))
}

/// GET /api/product/get-all-variations
pub async fn list_variations(State(state): State<AppState>) -> Result<Json<Vec<Variation>>> {
    Ok(Json(state.catalog().list_variations().await?))
}

// =============================================================================
// Categories
// =============================================================================

/// POST /api/product/add-category
pub async fn add_category(
    State(state): State<AppState>,
    VendorSession(_): VendorSession,
    ValidJson(name): ValidJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.catalog().add_category(&name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/product/get-all-categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().list_categories().await?))
}

/// PATCH /api/product/update-category/{categoryId}
pub async fn update_category(
    State(state): State<AppState>,
    VendorSession(_): VendorSession,
    Path(category_id): Path<String>,
    ValidJson(name): ValidJson<CategoryRequest>,
) -> Result<Json<Category>> {
    let category_id: CategoryId = parse_id(&category_id, "category")?;
    Ok(Json(
        state.catalog().rename_category(category_id, &name).await?,
    ))
}

/// DELETE /api/product/delete-category/{categoryId}
pub async fn delete_category(
    State(state): State<AppState>,
    VendorSession(_): VendorSession,
    Path(category_id): Path<String>,
) -> Result<Json<Category>> {
    let category_id: CategoryId = parse_id(&category_id, "category")?;
    Ok(Json(state.catalog().delete_category(category_id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> Received {
        Received {
            files: Vec::new(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_variation_draft_parses_fields() {
        let product_id = ProductId::generate();
        let draft = variation_draft(&form(&[
            ("productId", &product_id.to_string()),
            ("price", "12.50"),
            ("stock", "4"),
            ("color", "red"),
        ]))
        .unwrap();

        assert_eq!(draft.product_id, product_id);
        assert_eq!(draft.price.to_string(), "12.5");
        assert_eq!(draft.stock, 4);
        assert_eq!(draft.color.as_deref(), Some("red"));
        assert!(draft.size.is_none());
    }

    #[test]
    fn test_variation_draft_rejects_bad_numbers() {
        let Err(ServiceError::Validation(errors)) = variation_draft(&form(&[
            ("productId", "p"),
            ("price", "-1"),
            ("stock", "3000000000"),
        ])) else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["price", "stock"]);
    }

    #[test]
    fn test_variation_update_keeps_absent_fields() {
        let variation_id = VariationId::generate();
        let (id, update) = variation_update(&form(&[
            ("variationId", &variation_id.to_string()),
            ("stock", "9"),
            ("size", ""),
        ]))
        .unwrap();

        assert_eq!(id, variation_id);
        assert_eq!(update.stock, Some(9));
        assert!(update.price.is_none());
        assert_eq!(update.size.as_deref(), Some(""));
        assert!(update.color.is_none());
    }

    #[test]
    fn test_variation_update_requires_id() {
        assert!(matches!(
            variation_update(&form(&[("stock", "1")])),
            Err(ServiceError::Validation(_))
        ));
    }
}
