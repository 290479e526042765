//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Store connectivity
//! GET  /uploads/...            - Stored attachments (read-only)
//!
//! # Accounts (/api/user)
//! POST   /register             - Create account, returns token (201)
//! POST   /login                - Returns token
//! GET    /send-otp             - Mail a verification code (account session)
//! GET    /verify-otp           - Confirm code from the mailed link, redirects
//! GET    /profile              - Account profile (account session)
//! PATCH  /update-profile       - Change name (account session)
//! PATCH  /update-password      - Change password (account session)
//! POST   /forgot-password      - Mail a reset code
//! POST   /reset-password       - Set a new password with a reset code
//! DELETE /delete-account       - Delete account (account session)
//!
//! # Vendors (/api/vendor)
//! POST   /login                - Vendor token, creates the vendor on first login
//! GET    /protected            - Vendor session probe
//! GET    /profile              - Vendor profile
//! PATCH  /update               - business_name, brand_description
//! PATCH  /update-logo          - Multipart, one `logo` file
//! DELETE /delete               - Delete vendor
//!
//! # Catalog (/api/product)
//! POST   /create                                  - Create product (201)
//! PATCH  /update/{productId}                      - Rename / describe product
//! POST   /add-variation                           - Multipart, 1-5 `image` files (201)
//! PATCH  /update-variation                        - Multipart, replaces images
//! DELETE /delete/{productId}                      - Cascading delete
//! DELETE /delete-variation/{productId}/{variationId}
//! GET    /get-all, /get/{productId}, /get-all-variations, /get-all-categories
//! POST   /add-category (201), PATCH /update-category/{id}, DELETE /delete-category/{id}
//! ```

pub mod accounts;
pub mod extract;
pub mod products;
pub mod vendors;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use serde::Serialize;

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::services::ServiceError;
use crate::state::AppState;

/// A plain confirmation body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Parse a path or query id. An id that does not parse cannot exist.
///
/// # Errors
///
/// Returns `ServiceError::NotFound` naming the entity.
pub fn parse_id<T: std::str::FromStr>(raw: &str, entity: &str) -> Result<T, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::NotFound(format!("{entity} not found")))
}

fn limited(router: Router<AppState>, limiter: Option<&RateLimiterLayer>) -> Router<AppState> {
    match limiter {
        Some(layer) => router.layer(layer.clone()),
        None => router,
    }
}

/// Account routes. `limiter` applies to the credential endpoints only.
pub fn account_routes(limiter: Option<&RateLimiterLayer>) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/forgot-password", post(accounts::forgot_password))
        .route("/reset-password", post(accounts::reset_password));

    Router::new()
        .merge(limited(credentials, limiter))
        .route("/send-otp", get(accounts::send_otp))
        .route("/verify-otp", get(accounts::verify_otp))
        .route("/profile", get(accounts::profile))
        .route("/update-profile", patch(accounts::update_profile))
        .route("/update-password", patch(accounts::update_password))
        .route("/delete-account", delete(accounts::delete_account))
}

/// Vendor routes. `limiter` applies to vendor login only.
pub fn vendor_routes(limiter: Option<&RateLimiterLayer>) -> Router<AppState> {
    let credentials = Router::new().route("/login", post(vendors::login));

    Router::new()
        .merge(limited(credentials, limiter))
        .route("/protected", get(vendors::protected))
        .route("/profile", get(vendors::profile))
        .route("/update", patch(vendors::update))
        .route(
            "/update-logo",
            patch(vendors::update_logo).layer(DefaultBodyLimit::max(extract::MULTIPART_BODY_LIMIT)),
        )
        .route("/delete", delete(vendors::delete))
}

/// Catalog routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(products::create))
        .route("/update/{product_id}", patch(products::update))
        .route(
            "/add-variation",
            post(products::add_variation)
                .layer(DefaultBodyLimit::max(extract::MULTIPART_BODY_LIMIT)),
        )
        .route(
            "/update-variation",
            patch(products::update_variation)
                .layer(DefaultBodyLimit::max(extract::MULTIPART_BODY_LIMIT)),
        )
        .route("/delete/{product_id}", delete(products::delete))
        .route(
            "/delete-variation/{product_id}/{variation_id}",
            delete(products::delete_variation),
        )
        .route("/get-all", get(products::list))
        .route("/get/{product_id}", get(products::get))
        .route("/get-all-variations", get(products::list_variations))
        .route("/get-all-categories", get(products::list_categories))
        .route("/add-category", post(products::add_category))
        .route("/update-category/{category_id}", patch(products::update_category))
        .route("/delete-category/{category_id}", delete(products::delete_category))
}

/// All API routes.
pub fn routes(limiter: Option<&RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .nest("/api/user", account_routes(limiter))
        .nest("/api/vendor", vendor_routes(limiter))
        .nest("/api/product", product_routes())
}
