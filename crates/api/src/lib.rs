//! Marketplace API library.
//!
//! A multi-tenant marketplace backend: accounts with email verification and
//! password reset, vendors derived from accounts, and vendor-owned products
//! whose variations carry image attachments.
//!
//! The router is exposed through [`app`] so the binary and the integration
//! tests build exactly the same service.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Build the full router: API routes, health checks and `/uploads`.
pub fn app(state: AppState) -> Router {
    build(state, None)
}

/// Like [`app`], with `limiter` guarding the credential endpoints.
pub fn app_with_limiter(state: AppState, limiter: &RateLimiterLayer) -> Router {
    build(state, Some(limiter))
}

fn build(state: AppState, limiter: Option<&RateLimiterLayer>) -> Router {
    let uploads = ServeDir::new(state.uploads().root());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(limiter))
        .nest_service("/uploads", uploads)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the document store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
