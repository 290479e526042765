//! Domain models for the marketplace.
//!
//! These types represent validated domain objects separate from database row
//! types. Response views that hide internal fields live next to the model
//! they project.

pub mod account;
pub mod catalog;
pub mod vendor;

pub use account::{Account, AccountProfile, NewAccount};
pub use catalog::{
    Category, ImageMap, NewProduct, NewVariation, Product, ProductView, Variation, image_map,
};
pub use vendor::Vendor;
