//! Marketplace Core - Shared domain types.
//!
//! This crate provides the types shared by every marketplace component:
//! - `api` - The REST backend (accounts, vendors, catalog)
//! - `cli` - Operator tooling for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, account kinds
//!   and attachment folders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
