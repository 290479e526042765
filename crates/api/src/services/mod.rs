//! Business logic services.
//!
//! # Services
//!
//! - `accounts` - Registration, login, verification codes, password reset
//! - `vendors` - Vendor sessions, profiles and logos
//! - `catalog` - Categories, products, variations and cascading deletes
//! - `sessions` - Signed session tokens for accounts and vendors
//! - `credentials` - Password hashing
//! - `email` - Verification and reset mail
//! - `uploads` - Attachment files on disk
//!
//! Services borrow their collaborators from [`crate::state::AppState`] and are
//! cheap to build per request.

pub mod accounts;
pub mod catalog;
pub mod credentials;
pub mod email;
mod error;
pub mod sessions;
pub mod uploads;
pub mod vendors;

pub use error::{FieldError, Result, ServiceError};
