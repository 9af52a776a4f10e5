//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{
    EffectiveView, EmptyAxes, GenerateError, GenerationInput, ProductKey, ProductRef,
    ResolveError, Selection, SortKey, VariantOverride, effective_view, generate_variants, listing,
    pick_variant,
};
use crate::core::ServerState;
use crate::db::repository::{product, variant};
use crate::utils::{AppError, AppResult};
use shared::models::{
    Axis, ListingConfig, Product, ProductCreate, ProductImages, ProductStatus, ProductUpdate,
    Variant, VariantCreate, validate_axes,
};

/// Query parameter naming the explicit variant id in a resolution call
const PARAM_VARIANT: &str = "variant";

/// Product + variants response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
}

// =============================================================================
// Listing
// =============================================================================

/// Query params for the catalog listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

/// GET /products - 商品列表投影 (含虚拟变体卡片)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<listing::ListingItem>>> {
    let candidates = product::list_published(
        &state.pool,
        query.category.as_deref(),
        query.search.as_deref(),
    )
    .await?;

    let mut items = listing::project(candidates);
    listing::sort_items(&mut items, SortKey::parse(query.sort.as_deref()));
    if let Some(limit) = query.limit {
        items.truncate(limit);
    }
    Ok(Json(items))
}

// =============================================================================
// Single-item resolution
// =============================================================================

/// GET /products/:ref - 解析单个商品 (id / slug / 虚拟 id / 属性选择)
pub async fn get_by_ref(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<EffectiveView>> {
    let parsed: ProductRef = reference
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid product reference: {e}")))?;

    let (key, ref_variant_id) = match parsed {
        ProductRef::Id(id) => (ProductKey::Id(id), None),
        ProductRef::Slug(slug) => (ProductKey::Slug(slug), None),
        ProductRef::Virtual { key, variant_id } => (key, Some(variant_id)),
    };

    let product = load_product(&state, &key).await?;
    let variants = variant::find_by_product(&state.pool, product.id).await?;

    // The virtual-id suffix is the explicit selection; a `variant` query
    // parameter covers plain refs
    let variant_id = ref_variant_id.or_else(|| {
        params
            .get(PARAM_VARIANT)
            .and_then(|raw| raw.parse::<i64>().ok())
    });
    let attributes: BTreeMap<String, String> = params
        .into_iter()
        .filter(|(k, _)| k != PARAM_VARIANT)
        .collect();

    let selection = Selection {
        variant_id,
        attributes,
    };

    let picked = pick_variant(&product, &variants, &selection).map_err(|e| match e {
        ResolveError::UnknownAxis(_) => AppError::validation(e.to_string()),
        ResolveError::VariantNotFound(_) | ResolveError::NoMatch => {
            AppError::not_found(e.to_string())
        }
    })?;

    Ok(Json(effective_view(&product, picked)))
}

// =============================================================================
// Create (explicit variants)
// =============================================================================

/// Create product payload: product fields plus explicit variants
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Axis>,
    pub images: Option<ProductImages>,
    #[serde(default)]
    pub listing_config: ListingConfig,
    pub content: Option<serde_json::Value>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub variants: Vec<VariantCreate>,
}

/// POST /products - 创建商品及显式变体
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ProductWithVariants>)> {
    let name = required_name(payload.name.as_deref())?;
    let images = required_images(payload.images)?;
    validate_axes(&payload.attributes).map_err(AppError::validation)?;
    validate_variant_payloads(&payload.variants)?;

    let slug = resolve_slug(payload.slug.as_deref(), &name)?;

    let data = ProductCreate {
        slug,
        name,
        tagline: payload.tagline,
        short_description: payload.short_description,
        description: payload.description,
        attributes: payload.attributes,
        images,
        listing_config: payload.listing_config,
        content: payload.content,
        status: payload.status.unwrap_or(ProductStatus::Published),
        category_id: payload.category_id,
    };

    let (product, variants) = product::create(&state.pool, data, &payload.variants).await?;
    tracing::info!(product_id = product.id, slug = %product.slug, variants = variants.len(), "Product created");

    Ok((StatusCode::CREATED, Json(ProductWithVariants { product, variants })))
}

// =============================================================================
// Create via attribute combinator
// =============================================================================

/// Generate product payload: compact axes + overrides instead of
/// explicit variants
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    /// SKU prefix; falls back to the slug
    pub base_sku: Option<String>,
    /// Minor currency units
    #[serde(default)]
    pub base_price: i64,
    #[serde(default)]
    pub base_stock: i64,
    #[serde(default)]
    pub options: Vec<Axis>,
    #[serde(default)]
    pub variant_overrides: Vec<VariantOverride>,
    /// Axis value → image URL
    #[serde(default)]
    pub image_map: BTreeMap<String, String>,
    pub images: Option<ProductImages>,
    pub tagline: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub listing_config: ListingConfig,
    pub content: Option<serde_json::Value>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<i64>,
    /// Explicit opt-in to a single default variant when no axes are given
    #[serde(default)]
    pub allow_empty_options: bool,
}

/// POST /products/generate - 通过属性组合器创建商品
pub async fn generate(
    State(state): State<ServerState>,
    Json(payload): Json<GenerateProductRequest>,
) -> AppResult<(StatusCode, Json<ProductWithVariants>)> {
    let name = required_name(payload.name.as_deref())?;
    if payload.options.is_empty() && !payload.allow_empty_options {
        return Err(AppError::validation("Options are required"));
    }
    if payload.base_price < 0 || payload.base_stock < 0 {
        return Err(AppError::validation("Base price and stock must be non-negative"));
    }

    let slug = resolve_slug(payload.slug.as_deref(), &name)?;
    let images = payload.images.unwrap_or_default();

    let sku_prefix = payload
        .base_sku
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&slug);
    let fallback_image = Some(images.main.as_str()).filter(|m| !m.is_empty());

    let generation = GenerationInput {
        product_name: &name,
        sku_prefix,
        base_price: payload.base_price,
        base_stock: payload.base_stock,
        axes: &payload.options,
        overrides: &payload.variant_overrides,
        image_map: &payload.image_map,
        fallback_image,
    };
    let on_empty = if payload.allow_empty_options {
        EmptyAxes::SingleDefault
    } else {
        EmptyAxes::Reject
    };
    let drafts = generate_variants(
        &generation,
        on_empty,
        state.config.max_variants_per_product,
    )
    .map_err(generate_error_to_app)?;

    let data = ProductCreate {
        slug,
        name,
        tagline: payload.tagline,
        short_description: payload.short_description,
        description: payload.description,
        // The parent product records the full axes it was generated from
        attributes: payload.options,
        images,
        listing_config: payload.listing_config,
        content: payload.content,
        status: payload.status.unwrap_or(ProductStatus::Published),
        category_id: payload.category_id,
    };

    let (product, variants) = product::create(&state.pool, data, &drafts).await?;
    tracing::info!(product_id = product.id, slug = %product.slug, variants = variants.len(), "Product generated");

    Ok((StatusCode::CREATED, Json(ProductWithVariants { product, variants })))
}

fn generate_error_to_app(e: GenerateError) -> AppError {
    AppError::validation(e.to_string())
}

// =============================================================================
// Update / Delete
// =============================================================================

/// Update payload: product fields plus an optional full variant
/// replacement
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(flatten)]
    pub fields: ProductUpdate,
    pub variants: Option<Vec<VariantCreate>>,
}

/// PUT /products/:ref - 更新商品 (可选整体替换变体)
pub async fn update(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ProductWithVariants>> {
    let key = plain_key(&reference)?;
    let existing = load_product(&state, &key).await?;

    if let Some(ref axes) = payload.fields.attributes {
        validate_axes(axes).map_err(AppError::validation)?;
    }
    if let Some(ref variants) = payload.variants {
        validate_variant_payloads(variants)?;
    }

    let (product, variants) = product::update(
        &state.pool,
        existing.id,
        payload.fields,
        payload.variants.as_deref(),
    )
    .await?;
    tracing::info!(product_id = product.id, "Product updated");

    Ok(Json(ProductWithVariants { product, variants }))
}

/// DELETE /products/:ref - 删除商品
pub async fn delete(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> AppResult<Json<bool>> {
    let key = plain_key(&reference)?;
    let existing = load_product(&state, &key).await?;

    product::delete(&state.pool, existing.id).await?;
    tracing::info!(product_id = existing.id, "Product deleted");

    Ok(Json(true))
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_product(state: &ServerState, key: &ProductKey) -> AppResult<Product> {
    let found = match key {
        ProductKey::Id(id) => product::find_by_id(&state.pool, *id).await?,
        ProductKey::Slug(slug) => product::find_by_slug(&state.pool, slug).await?,
    };
    found.ok_or_else(|| AppError::not_found(format!("Product {key}")))
}

/// Parse a ref that must address a product directly (no virtual ids)
fn plain_key(reference: &str) -> AppResult<ProductKey> {
    let parsed: ProductRef = reference
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid product reference: {e}")))?;
    match parsed {
        ProductRef::Id(id) => Ok(ProductKey::Id(id)),
        ProductRef::Slug(slug) => Ok(ProductKey::Slug(slug)),
        ProductRef::Virtual { .. } => Err(AppError::validation(
            "Virtual ids cannot address product mutations",
        )),
    }
}

fn required_name(name: Option<&str>) -> AppResult<String> {
    match name {
        Some(n) if !n.trim().is_empty() => Ok(n.trim().to_string()),
        _ => Err(AppError::validation("Product name is required")),
    }
}

fn required_images(images: Option<ProductImages>) -> AppResult<ProductImages> {
    match images {
        Some(i) if !i.main.trim().is_empty() => Ok(i),
        _ => Err(AppError::validation("Main image is required")),
    }
}

fn resolve_slug(slug: Option<&str>, name: &str) -> AppResult<String> {
    let slug = match slug {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => shared::util::slugify(name),
    };
    if slug.is_empty() {
        return Err(AppError::validation("Product slug cannot be empty"));
    }
    Ok(slug)
}

fn validate_variant_payloads(variants: &[VariantCreate]) -> AppResult<()> {
    for v in variants {
        if v.name.trim().is_empty() || v.sku.trim().is_empty() {
            return Err(AppError::validation("Variant name and SKU are required"));
        }
        if v.price < 0 {
            return Err(AppError::validation(format!(
                "Variant {} price must be non-negative",
                v.sku
            )));
        }
        if v.stock < 0 {
            return Err(AppError::validation(format!(
                "Variant {} stock must be non-negative",
                v.sku
            )));
        }
    }
    Ok(())
}
