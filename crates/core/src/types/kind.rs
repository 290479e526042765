//! Account kinds and attachment folders.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string names no known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {what}: {value}")]
pub struct UnknownVariant {
    /// What was being parsed.
    pub what: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Role of an account.
///
/// Every account starts as a `User`. An account becomes a `Vendor` only
/// through an operator action, after which a vendor profile is provisioned
/// for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    User,
    Vendor,
}

impl AccountKind {
    /// Wire and storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Vendor => "vendor",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "vendor" => Ok(Self::Vendor),
            _ => Err(UnknownVariant {
                what: "account kind",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for AccountKind {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AccountKind {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for AccountKind {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Storage folder an uploaded file belongs to.
///
/// Stored attachment paths are always `<folder>/<filename>`, and the same
/// string is what the server exposes under `/uploads/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadFolder {
    ProductImage,
    VendorLogo,
}

impl UploadFolder {
    /// Directory name under the upload root.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductImage => "productImage",
            Self::VendorLogo => "vendorLogo",
        }
    }

    /// Build the stored path for a file in this folder.
    #[must_use]
    pub fn path_for(self, filename: &str) -> String {
        format!("{}/{filename}", self.as_str())
    }
}

impl fmt::Display for UploadFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_account_kind_wire_form() {
        assert_eq!(serde_json::to_string(&AccountKind::Vendor).unwrap(), "\"vendor\"");
        assert_eq!("user".parse::<AccountKind>().unwrap(), AccountKind::User);
        assert!("admin".parse::<AccountKind>().is_err());
        assert_eq!(AccountKind::default(), AccountKind::User);
    }

    #[test]
    fn test_upload_paths_are_folder_prefixed() {
        assert_eq!(
            UploadFolder::ProductImage.path_for("1-a.png"),
            "productImage/1-a.png"
        );
        assert_eq!(UploadFolder::VendorLogo.path_for("x"), "vendorLogo/x");
    }
}
