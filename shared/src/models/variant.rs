//! Variant Model
//!
//! One concrete, independently priced and stocked combination of axis
//! values belonging to a product. Identity (id, SKU) is immutable once a
//! variant is referenced by an order line item; the storage layer
//! enforces this with foreign keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis name → selected value for one variant.
///
/// The product side keeps ordered value *sets* per axis; the variant side
/// pins exactly one value per axis.
pub type VariantAttributes = BTreeMap<String, String>;

/// Variant entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    /// Globally unique SKU
    pub sku: String,
    /// Price in minor currency units (cents)
    pub price: i64,
    /// Optional compare-at price in minor units
    pub original_price: Option<i64>,
    /// Stock counter, never negative
    pub stock: i64,
    #[serde(default)]
    pub attributes: VariantAttributes,
    /// Image override; falls back to the product main image when absent
    pub image: Option<String>,
    /// Description override; falls back to the product description
    pub description: Option<String>,
    /// Persisted order within the product
    pub position: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// New variant payload — used both for explicit admin input and as the
/// draft type produced by the attribute combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCreate {
    pub name: String,
    pub sku: String,
    /// Price in minor currency units (cents)
    pub price: i64,
    pub original_price: Option<i64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub attributes: VariantAttributes,
    pub image: Option<String>,
    pub description: Option<String>,
}
