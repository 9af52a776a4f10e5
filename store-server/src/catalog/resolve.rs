//! Single-item resolution
//!
//! Resolves one product reference plus an optional selection (explicit
//! variant id or attribute pairs) to a concrete sellable item, and
//! merges the variant's overrides over the product's fields into the
//! effective view.

use serde::{Deserialize, Serialize};
use shared::models::{Axis, Product, ProductImages, ProductStatus, Variant, VariantAttributes};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::reference::virtual_id;

/// Caller-supplied selection, parsed from query parameters
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Explicit variant id — takes priority over attribute pairs
    pub variant_id: Option<i64>,
    /// Axis name → wanted value, arbitrary subset of the product's axes
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("variant {0} not found")]
    VariantNotFound(i64),

    /// Strict matching: a selection key that names no product axis is an
    /// input error, not a silent no-op
    #[error("unknown attribute '{0}'")]
    UnknownAxis(String),

    #[error("no variant matches the selection")]
    NoMatch,
}

/// Pick the variant a selection addresses.
///
/// Priority: explicit variant id, then attribute pairs, then the first
/// variant in persisted order. `Ok(None)` only for a variant-less
/// product with no explicit selection.
pub fn pick_variant<'a>(
    product: &Product,
    variants: &'a [Variant],
    selection: &Selection,
) -> Result<Option<&'a Variant>, ResolveError> {
    // 1. Explicit variant id
    if let Some(wanted) = selection.variant_id {
        return variants
            .iter()
            .find(|v| v.id == wanted)
            .map(Some)
            .ok_or(ResolveError::VariantNotFound(wanted));
    }

    // 2. Attribute selection (strict: keys must be product axes)
    if !selection.attributes.is_empty() {
        for key in selection.attributes.keys() {
            if !product.attributes.iter().any(|axis| &axis.name == key) {
                return Err(ResolveError::UnknownAxis(key.clone()));
            }
        }
        return variants
            .iter()
            .find(|v| {
                selection
                    .attributes
                    .iter()
                    .all(|(axis, wanted)| v.attributes.get(axis) == Some(wanted))
            })
            .map(Some)
            .ok_or(ResolveError::NoMatch);
    }

    // 3. Default: first variant in persisted order
    Ok(variants.first())
}

/// The merged display object for a resolved product/variant pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveView {
    /// Resolvable reference: virtual id when a variant is selected,
    /// else the product slug
    pub id: String,
    pub product_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    pub slug: String,
    pub name: String,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    /// Minor currency units; null for a variant-less product
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,
    pub stock: Option<i64>,
    pub sku: Option<String>,
    /// The selected variant's pinned values
    pub attributes: VariantAttributes,
    /// The product's full axes, for selection UIs
    pub axes: Vec<Axis>,
    pub images: ProductImages,
    pub status: ProductStatus,
    pub category_id: Option<i64>,
    pub content: Option<serde_json::Value>,
}

/// Merge fields: the variant's own values win, the product fills the
/// gaps.
pub fn effective_view(product: &Product, variant: Option<&Variant>) -> EffectiveView {
    let mut images = product.images.clone();
    if let Some(img) = variant.and_then(|v| v.image.as_ref()) {
        images.main = img.clone();
    }

    EffectiveView {
        id: match variant {
            Some(v) => virtual_id(&product.slug, v.id),
            None => product.slug.clone(),
        },
        product_id: product.id,
        variant_id: variant.map(|v| v.id),
        slug: product.slug.clone(),
        name: variant
            .map(|v| v.name.clone())
            .unwrap_or_else(|| product.name.clone()),
        tagline: product.tagline.clone(),
        short_description: product.short_description.clone(),
        description: variant
            .and_then(|v| v.description.clone())
            .or_else(|| product.description.clone()),
        price: variant.map(|v| v.price),
        original_price: variant.and_then(|v| v.original_price),
        stock: variant.map(|v| v.stock),
        sku: variant.map(|v| v.sku.clone()),
        attributes: variant.map(|v| v.attributes.clone()).unwrap_or_default(),
        axes: product.attributes.clone(),
        images,
        status: product.status,
        category_id: product.category_id,
        content: product.content.clone(),
    }
}
