//! Vendor routes, mounted at `/api/vendor`.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::{Deserialize, Serialize};

use super::Message;
use super::accounts::{Credentials, LoginRequest};
use super::extract::{self, Checks, VENDOR_LOGO, Validate, ValidJson};
use crate::error::Result;
use crate::middleware::VendorSession;
use crate::models::Vendor;
use crate::services::vendors::VendorUpdate;
use crate::services::{FieldError, ServiceError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VendorLoginResponse {
    pub token: String,
    pub vendor: Vendor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateVendorRequest {
    pub business_name: String,
    pub brand_description: String,
}

impl Validate for UpdateVendorRequest {
    type Valid = VendorUpdate;

    fn validate(self) -> std::result::Result<VendorUpdate, Vec<FieldError>> {
        let mut checks = Checks::new();
        let business_name = checks.required("business_name", &self.business_name);
        let brand_description = checks.required("brand_description", &self.brand_description);
        checks.finish(|| {
            Some(VendorUpdate {
                business_name,
                brand_description,
            })
        })
    }
}

/// POST /api/vendor/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(credentials): ValidJson<LoginRequest>,
) -> Result<Json<VendorLoginResponse>> {
    let Credentials { email, password } = credentials;
    if password.chars().count() < 6 {
        return Err(ServiceError::invalid("password", "must be at least 6 characters").into());
    }

    let (token, vendor) = state.vendors().login(&email, &password).await?;
    Ok(Json(VendorLoginResponse { token, vendor }))
}

/// GET /api/vendor/protected
pub async fn protected(VendorSession(_): VendorSession) -> Json<Message> {
    Json(Message::new("User is a Vendor"))
}

/// GET /api/vendor/profile
pub async fn profile(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
) -> Result<Json<Vendor>> {
    Ok(Json(state.vendors().profile(vendor_id).await?))
}

/// PATCH /api/vendor/update
pub async fn update(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    ValidJson(update): ValidJson<UpdateVendorRequest>,
) -> Result<Json<Vendor>> {
    Ok(Json(state.vendors().update_profile(vendor_id, update).await?))
}

/// PATCH /api/vendor/update-logo
///
/// Multipart body with exactly one `logo` file.
pub async fn update_logo(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
    multipart: Multipart,
) -> Result<Json<Vendor>> {
    let received = extract::receive(multipart, state.uploads(), VENDOR_LOGO).await?;
    let Some(logo) = received.files.into_iter().next() else {
        return Err(ServiceError::invalid("logo", "exactly one file is required").into());
    };

    Ok(Json(state.vendors().update_logo(vendor_id, logo).await?))
}

/// DELETE /api/vendor/delete
pub async fn delete(
    State(state): State<AppState>,
    VendorSession(vendor_id): VendorSession,
) -> Result<Json<Message>> {
    state.vendors().delete(vendor_id).await?;
    Ok(Json(Message::new("Vendor deleted")))
}
