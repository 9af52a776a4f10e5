//! Listing projection
//!
//! Maps persisted product+variant rows to the flat storefront listing.
//! Products flagged `expose_variants_as_cards` contribute one virtual
//! item per variant and their own base row is suppressed, so the same
//! purchasable thing never appears twice in one result set.

use serde::{Deserialize, Serialize};
use shared::models::Variant;

use crate::catalog::reference::virtual_id;
use crate::db::repository::product::ListingCandidate;

/// Sort keys accepted by the listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    Oldest,
    Newest,
}

impl SortKey {
    /// Unknown or missing values fall back to newest-first
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortKey::PriceAsc,
            Some("desc") => SortKey::PriceDesc,
            Some("oldest") => SortKey::Oldest,
            _ => SortKey::Newest,
        }
    }
}

/// One storefront listing card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    /// Resolvable reference: the product slug, or a virtual id for
    /// variant cards
    pub id: String,
    pub product_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    pub slug: String,
    pub name: String,
    /// Minor currency units; null for a product with no variants yet
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    pub created_at: i64,
}

/// Project candidates into listing items.
///
/// Candidate order is preserved; virtual items follow the variants'
/// persisted order within their product.
pub fn project(candidates: Vec<ListingCandidate>) -> Vec<ListingItem> {
    let mut items = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let product = candidate.product;
        let category_slug = candidate.category_slug;

        if product.listing_config.expose_variants_as_cards && !candidate.variants.is_empty() {
            // One card per variant; the base row is suppressed entirely
            for variant in &candidate.variants {
                items.push(ListingItem {
                    id: virtual_id(&product.slug, variant.id),
                    product_id: product.id,
                    variant_id: Some(variant.id),
                    slug: product.slug.clone(),
                    name: variant.name.clone(),
                    price: Some(variant.price),
                    original_price: variant.original_price,
                    image: variant
                        .image
                        .clone()
                        .unwrap_or_else(|| product.images.main.clone()),
                    category_slug: category_slug.clone(),
                    created_at: product.created_at,
                });
            }
        } else {
            let representative = cheapest_variant(&candidate.variants);
            items.push(ListingItem {
                id: product.slug.clone(),
                product_id: product.id,
                variant_id: None,
                slug: product.slug.clone(),
                name: product.name.clone(),
                price: representative.map(|v| v.price),
                original_price: representative.and_then(|v| v.original_price),
                image: product.images.main.clone(),
                category_slug,
                created_at: product.created_at,
            });
        }
    }

    items
}

/// Lowest-priced variant; ties resolve to the first in persisted order
fn cheapest_variant(variants: &[Variant]) -> Option<&Variant> {
    let mut best: Option<&Variant> = None;
    for v in variants {
        match best {
            Some(b) if v.price >= b.price => {}
            _ => best = Some(v),
        }
    }
    best
}

/// Sort projected items. Price sorts are stable, with price-less items
/// last; time sorts use the owning product's creation time.
pub fn sort_items(items: &mut [ListingItem], sort: SortKey) {
    match sort {
        SortKey::PriceAsc => items.sort_by_key(|i| i.price.unwrap_or(i64::MAX)),
        SortKey::PriceDesc => {
            items.sort_by(|a, b| b.price.unwrap_or(i64::MIN).cmp(&a.price.unwrap_or(i64::MIN)))
        }
        SortKey::Oldest => items.sort_by_key(|i| i.created_at),
        SortKey::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}
