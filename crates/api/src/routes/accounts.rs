//! Account routes, mounted at `/api/user`.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use serde::{Deserialize, Serialize};

use marketplace_core::{AccountId, Email};

use super::extract::{Checks, Validate, ValidJson};
use super::{Message, parse_id};
use crate::error::Result;
use crate::middleware::AccountSession;
use crate::models::AccountProfile;
use crate::services::FieldError;
use crate::services::accounts::Registration;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    type Valid = Registration;

    fn validate(self) -> std::result::Result<Registration, Vec<FieldError>> {
        let mut checks = Checks::new();
        let name = checks.required("name", &self.name);
        let email = checks.email("email", &self.email);
        let password = checks.password("password", &self.password, MIN_PASSWORD_LEN);
        checks.finish(|| {
            Some(Registration {
                name,
                email: email?,
                password,
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Checked login credentials.
#[derive(Debug)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl Validate for LoginRequest {
    type Valid = Credentials;

    fn validate(self) -> std::result::Result<Credentials, Vec<FieldError>> {
        let mut checks = Checks::new();
        let email = checks.email("email", &self.email);
        if self.password.is_empty() {
            checks.fail("password", "is required");
        }
        checks.finish(|| {
            Some(Credentials {
                email: email?,
                password: self.password,
            })
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: String,
}

impl Validate for UpdateProfileRequest {
    type Valid = String;

    fn validate(self) -> std::result::Result<String, Vec<FieldError>> {
        let mut checks = Checks::new();
        let name = checks.required("name", &self.name);
        checks.finish(|| Some(name))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for UpdatePasswordRequest {
    type Valid = Self;

    fn validate(self) -> std::result::Result<Self, Vec<FieldError>> {
        let mut checks = Checks::new();
        if self.old_password.is_empty() {
            checks.fail("oldPassword", "is required");
        }
        checks.password("newPassword", &self.new_password, MIN_PASSWORD_LEN);
        checks.finish(|| Some(self))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl Validate for ForgotPasswordRequest {
    type Valid = Email;

    fn validate(self) -> std::result::Result<Email, Vec<FieldError>> {
        let mut checks = Checks::new();
        let email = checks.email("email", &self.email);
        checks.finish(|| email)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub code: String,
    pub uid: String,
    pub new_password: String,
}

impl Validate for ResetPasswordRequest {
    type Valid = Self;

    fn validate(self) -> std::result::Result<Self, Vec<FieldError>> {
        let mut checks = Checks::new();
        checks.required("code", &self.code);
        checks.required("uid", &self.uid);
        checks.password("newPassword", &self.new_password, MIN_PASSWORD_LEN);
        checks.finish(|| Some(self))
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub uid: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    ValidJson(registration): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let token = state.accounts().register(registration).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(credentials): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .accounts()
        .login(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/user/send-otp
pub async fn send_otp(
    State(state): State<AppState>,
    AccountSession(account_id): AccountSession,
) -> Result<Json<Message>> {
    state.accounts().send_verification_code(account_id).await?;
    Ok(Json(Message::new("Verification code sent")))
}

/// GET /api/user/verify-otp?code=...&uid=...
///
/// Reached from the emailed link, so success redirects to the profile page.
pub async fn verify_otp(
    State(state): State<AppState>,
    Query(query): Query<VerifyOtpQuery>,
) -> Result<Redirect> {
    let account_id: AccountId = parse_id(&query.uid, "account")?;
    state.accounts().verify_code(account_id, &query.code).await?;
    Ok(Redirect::to(&format!("{}/profile", state.config().public_url)))
}

/// GET /api/user/profile
pub async fn profile(
    State(state): State<AppState>,
    AccountSession(account_id): AccountSession,
) -> Result<Json<AccountProfile>> {
    Ok(Json(state.accounts().profile(account_id).await?))
}

/// PATCH /api/user/update-profile
pub async fn update_profile(
    State(state): State<AppState>,
    AccountSession(account_id): AccountSession,
    ValidJson(name): ValidJson<UpdateProfileRequest>,
) -> Result<Json<AccountProfile>> {
    Ok(Json(state.accounts().update_profile(account_id, name).await?))
}

/// PATCH /api/user/update-password
pub async fn update_password(
    State(state): State<AppState>,
    AccountSession(account_id): AccountSession,
    ValidJson(body): ValidJson<UpdatePasswordRequest>,
) -> Result<Json<Message>> {
    state
        .accounts()
        .update_password(account_id, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(Message::new("Password updated")))
}

/// POST /api/user/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(email): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<Message>> {
    state.accounts().forgot_password(&email).await?;
    Ok(Json(Message::new("Password reset code sent")))
}

/// POST /api/user/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetPasswordRequest>,
) -> Result<Json<Message>> {
    let account_id: AccountId = parse_id(&body.uid, "account")?;
    state
        .accounts()
        .reset_password(account_id, &body.code, &body.new_password)
        .await?;
    Ok(Json(Message::new("Password reset")))
}

/// DELETE /api/user/delete-account
pub async fn delete_account(
    State(state): State<AppState>,
    AccountSession(account_id): AccountSession,
) -> Result<Json<Message>> {
    state.accounts().delete_account(account_id).await?;
    Ok(Json(Message::new("Account deleted")))
}
