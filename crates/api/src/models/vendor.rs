//! Vendor domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{AccountId, VendorId};

/// A seller profile derived from exactly one account.
///
/// Serialized with snake_case field names, which is what vendor clients
/// send back on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    pub id: VendorId,
    pub account_id: AccountId,
    pub business_name: Option<String>,
    pub brand_description: Option<String>,
    /// Stored attachment path (`vendorLogo/<file>`).
    pub brand_logo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    /// An empty profile for a freshly provisioned vendor.
    #[must_use]
    pub fn empty(account_id: AccountId) -> Self {
        Self {
            id: VendorId::generate(),
            account_id,
            business_name: None,
            brand_description: None,
            brand_logo: None,
            created_at: Utc::now(),
        }
    }
}
