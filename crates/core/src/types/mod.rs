//! Core types for the marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod kind;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use kind::{AccountKind, UnknownVariant, UploadFolder};
pub use price::{Price, PriceError};
