//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. Rate limiting on credential endpoints (binary only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{ACCESS_TOKEN_HEADER, AccountSession, VendorSession};
pub use rate_limit::credentials_rate_limiter;
pub use request_id::request_id_middleware;
