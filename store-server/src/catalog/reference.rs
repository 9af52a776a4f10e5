//! Catalog references
//!
//! A `{ref}` path segment can be a numeric product id, a product slug,
//! or a composite virtual id addressing a single variant. The kind is
//! decided once, here, at the API boundary — nothing downstream sniffs
//! strings.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed literal separator between the product key and the variant id
/// in a virtual id, e.g. `protein-powder-v-42`.
pub const VIRTUAL_SEPARATOR: &str = "-v-";

/// How the product half of a reference is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKey {
    Id(i64),
    Slug(String),
}

impl ProductKey {
    pub fn parse(raw: &str) -> Result<Self, RefParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RefParseError::Empty);
        }
        match raw.parse::<i64>() {
            Ok(id) if id >= 0 => Ok(ProductKey::Id(id)),
            _ => Ok(ProductKey::Slug(raw.to_string())),
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKey::Id(id) => write!(f, "{id}"),
            ProductKey::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Parsed product/variant reference — the tagged union for `{ref}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(i64),
    Slug(String),
    Virtual { key: ProductKey, variant_id: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefParseError {
    #[error("reference cannot be empty")]
    Empty,
}

impl FromStr for ProductRef {
    type Err = RefParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RefParseError::Empty);
        }

        // Virtual id: split on the LAST separator so slugs containing
        // "-v-" still round-trip (the right half must be numeric)
        if let Some((key, suffix)) = raw.rsplit_once(VIRTUAL_SEPARATOR)
            && !key.is_empty()
            && let Ok(variant_id) = suffix.parse::<i64>()
            && variant_id >= 0
        {
            return Ok(ProductRef::Virtual {
                key: ProductKey::parse(key)?,
                variant_id,
            });
        }

        match ProductKey::parse(raw)? {
            ProductKey::Id(id) => Ok(ProductRef::Id(id)),
            ProductKey::Slug(slug) => Ok(ProductRef::Slug(slug)),
        }
    }
}

/// Compose a virtual id from a product key and a variant id
pub fn encode_virtual(key: &ProductKey, variant_id: i64) -> String {
    format!("{key}{VIRTUAL_SEPARATOR}{variant_id}")
}

/// Convenience for the common slug-keyed case
pub fn virtual_id(slug: &str, variant_id: i64) -> String {
    format!("{slug}{VIRTUAL_SEPARATOR}{variant_id}")
}
