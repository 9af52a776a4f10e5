//! Product Model
//!
//! A product is the browsable unit of the catalog. Its purchasable
//! concrete forms are [`crate::models::Variant`] rows; the product-level
//! `attributes` axes are descriptive only.

use serde::{Deserialize, Serialize};

/// One named axis of variation with its ordered candidate values
/// (e.g. `Flavor: [Chocolate, Vanilla]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub values: Vec<String>,
}

/// Product images: a required main image plus an optional gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImages {
    pub main: String,
    #[serde(default)]
    pub gallery: Vec<String>,
}

/// Listing behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingConfig {
    /// When true, the catalog listing emits one virtual card per variant
    /// instead of the product's own row.
    #[serde(default)]
    pub expose_variants_as_cards: bool,
}

/// Product lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "DRAFT",
            ProductStatus::Published => "PUBLISHED",
            ProductStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(ProductStatus::Draft),
            "PUBLISHED" => Some(ProductStatus::Published),
            "ARCHIVED" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    /// URL slug, globally unique
    pub slug: String,
    pub name: String,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    /// Ordered variation axes; descriptive at product level
    #[serde(default)]
    pub attributes: Vec<Axis>,
    pub images: ProductImages,
    #[serde(default)]
    pub listing_config: ListingConfig,
    /// Free-form content blocks (editor JSON)
    pub content: Option<serde_json::Value>,
    pub status: ProductStatus,
    pub category_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// New product payload (storage-level; API handlers fill in defaults)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub slug: String,
    pub name: String,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Axis>,
    pub images: ProductImages,
    #[serde(default)]
    pub listing_config: ListingConfig,
    pub content: Option<serde_json::Value>,
    pub status: ProductStatus,
    pub category_id: Option<i64>,
}

/// Update product payload — every field optional, missing fields untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<Vec<Axis>>,
    pub images: Option<ProductImages>,
    pub listing_config: Option<ListingConfig>,
    pub content: Option<serde_json::Value>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<i64>,
}

/// Validate product axes: unique non-empty names, each axis with at least
/// one value. Returns the offending axis name on failure.
pub fn validate_axes(axes: &[Axis]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for axis in axes {
        if axis.name.trim().is_empty() {
            return Err("axis name cannot be empty".to_string());
        }
        if !seen.insert(axis.name.as_str()) {
            return Err(format!("duplicate axis '{}'", axis.name));
        }
        if axis.values.iter().all(|v| v.trim().is_empty()) {
            return Err(format!("axis '{}' has no values", axis.name));
        }
    }
    Ok(())
}
