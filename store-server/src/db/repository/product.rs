//! Product Repository

use super::{RepoError, RepoResult, is_unique_violation, variant};
use shared::models::{
    Axis, ListingConfig, Product, ProductCreate, ProductImages, ProductStatus, ProductUpdate,
    Variant, VariantCreate,
};
use sqlx::SqlitePool;

const PRODUCT_SELECT: &str = "SELECT p.id, p.slug, p.name, p.tagline, p.short_description, \
     p.description, p.attributes, p.images, p.expose_variants_as_cards, p.content, p.status, \
     p.category_id, p.created_at, p.updated_at FROM product p";

/// Raw product row — `attributes`/`images`/`content` are JSON TEXT columns
#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    slug: String,
    name: String,
    tagline: Option<String>,
    short_description: Option<String>,
    description: Option<String>,
    attributes: String,
    images: String,
    expose_variants_as_cards: bool,
    content: Option<String>,
    status: String,
    category_id: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl ProductRow {
    pub(crate) fn into_product(self) -> RepoResult<Product> {
        let attributes: Vec<Axis> = serde_json::from_str(&self.attributes)
            .map_err(|e| RepoError::Database(format!("Corrupt axes on product {}: {e}", self.id)))?;
        let images: ProductImages = serde_json::from_str(&self.images)
            .map_err(|e| RepoError::Database(format!("Corrupt images on product {}: {e}", self.id)))?;
        let content = match self.content {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                RepoError::Database(format!("Corrupt content on product {}: {e}", self.id))
            })?),
            None => None,
        };
        let status = ProductStatus::parse(&self.status).ok_or_else(|| {
            RepoError::Database(format!("Unknown status '{}' on product {}", self.status, self.id))
        })?;
        Ok(Product {
            id: self.id,
            slug: self.slug,
            name: self.name,
            tagline: self.tagline,
            short_description: self.short_description,
            description: self.description,
            attributes,
            images,
            listing_config: ListingConfig {
                expose_variants_as_cards: self.expose_variants_as_cards,
            },
            content,
            status,
            category_id: self.category_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(ProductRow::into_product).transpose()
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE p.slug = ?");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    row.map(ProductRow::into_product).transpose()
}

/// One listing candidate: product, its variants in persisted order, and
/// the owning category slug when assigned.
pub struct ListingCandidate {
    pub product: Product,
    pub variants: Vec<Variant>,
    pub category_slug: Option<String>,
}

/// Published products for the catalog listing, optionally narrowed by
/// category slug and case-insensitive name search. Variants are fetched
/// in one batch query.
pub async fn list_published(
    pool: &SqlitePool,
    category_slug: Option<&str>,
    search: Option<&str>,
) -> RepoResult<Vec<ListingCandidate>> {
    #[derive(sqlx::FromRow)]
    struct CandidateRow {
        #[sqlx(flatten)]
        product: ProductRow,
        category_slug: Option<String>,
    }

    let mut sql = String::from(
        "SELECT p.id, p.slug, p.name, p.tagline, p.short_description, p.description, \
         p.attributes, p.images, p.expose_variants_as_cards, p.content, p.status, \
         p.category_id, p.created_at, p.updated_at, c.slug AS category_slug \
         FROM product p LEFT JOIN category c ON p.category_id = c.id \
         WHERE p.status = 'PUBLISHED'",
    );
    if category_slug.is_some() {
        sql.push_str(" AND c.slug = ?");
    }
    if search.is_some() {
        sql.push_str(" AND lower(p.name) LIKE ?");
    }
    sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

    let mut query = sqlx::query_as::<_, CandidateRow>(&sql);
    if let Some(cat) = category_slug {
        query = query.bind(cat.to_string());
    }
    if let Some(term) = search {
        query = query.bind(format!("%{}%", term.to_lowercase()));
    }
    let rows = query.fetch_all(pool).await?;

    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let category_slug = row.category_slug;
        let product = row.product.into_product()?;
        candidates.push(ListingCandidate {
            product,
            variants: Vec::new(),
            category_slug,
        });
    }
    if candidates.is_empty() {
        return Ok(candidates);
    }

    // Batch-fetch variants for the whole candidate set
    let placeholders = vec!["?"; candidates.len()].join(", ");
    let sql = format!(
        "SELECT id, product_id, name, sku, price, original_price, stock, attributes, image, \
         description, position, created_at, updated_at FROM variant \
         WHERE product_id IN ({placeholders}) ORDER BY product_id, position, id"
    );
    let mut query = sqlx::query_as::<_, variant::VariantRow>(&sql);
    for c in &candidates {
        query = query.bind(c.product.id);
    }
    let variant_rows = query.fetch_all(pool).await?;

    for row in variant_rows {
        let v = row.into_variant()?;
        if let Some(c) = candidates.iter_mut().find(|c| c.product.id == v.product_id) {
            c.variants.push(v);
        }
    }

    Ok(candidates)
}

/// Create a product together with its variants in one transaction
pub async fn create(
    pool: &SqlitePool,
    data: ProductCreate,
    variants: &[VariantCreate],
) -> RepoResult<(Product, Vec<Variant>)> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();

    let attributes = serde_json::to_string(&data.attributes)
        .map_err(|e| RepoError::Validation(format!("Unserializable axes: {e}")))?;
    let images = serde_json::to_string(&data.images)
        .map_err(|e| RepoError::Validation(format!("Unserializable images: {e}")))?;
    let content = match &data.content {
        Some(c) => Some(
            serde_json::to_string(c)
                .map_err(|e| RepoError::Validation(format!("Unserializable content: {e}")))?,
        ),
        None => None,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO product (id, slug, name, tagline, short_description, description, \
         attributes, images, expose_variants_as_cards, content, status, category_id, \
         created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
    )
    .bind(id)
    .bind(&data.slug)
    .bind(&data.name)
    .bind(&data.tagline)
    .bind(&data.short_description)
    .bind(&data.description)
    .bind(&attributes)
    .bind(&images)
    .bind(data.listing_config.expose_variants_as_cards)
    .bind(&content)
    .bind(data.status.as_str())
    .bind(data.category_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!("Product slug '{}' already exists", data.slug))
        } else {
            RepoError::from(e)
        }
    })?;

    variant::insert_many(&mut tx, id, variants).await?;

    tx.commit().await?;

    let product = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))?;
    let variants = variant::find_by_product(pool, id).await?;
    Ok((product, variants))
}

/// Update product fields; optionally replace the whole variant set
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: ProductUpdate,
    replace_variants: Option<&[VariantCreate]>,
) -> RepoResult<(Product, Vec<Variant>)> {
    let now = shared::util::now_millis();

    let attributes = match &data.attributes {
        Some(a) => Some(
            serde_json::to_string(a)
                .map_err(|e| RepoError::Validation(format!("Unserializable axes: {e}")))?,
        ),
        None => None,
    };
    let images = match &data.images {
        Some(i) => Some(
            serde_json::to_string(i)
                .map_err(|e| RepoError::Validation(format!("Unserializable images: {e}")))?,
        ),
        None => None,
    };
    let content = match &data.content {
        Some(c) => Some(
            serde_json::to_string(c)
                .map_err(|e| RepoError::Validation(format!("Unserializable content: {e}")))?,
        ),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE product SET \
         name = COALESCE(?1, name), \
         slug = COALESCE(?2, slug), \
         tagline = COALESCE(?3, tagline), \
         short_description = COALESCE(?4, short_description), \
         description = COALESCE(?5, description), \
         attributes = COALESCE(?6, attributes), \
         images = COALESCE(?7, images), \
         expose_variants_as_cards = COALESCE(?8, expose_variants_as_cards), \
         content = COALESCE(?9, content), \
         status = COALESCE(?10, status), \
         category_id = COALESCE(?11, category_id), \
         updated_at = ?12 \
         WHERE id = ?13",
    )
    .bind(&data.name)
    .bind(&data.slug)
    .bind(&data.tagline)
    .bind(&data.short_description)
    .bind(&data.description)
    .bind(&attributes)
    .bind(&images)
    .bind(data.listing_config.as_ref().map(|l| l.expose_variants_as_cards))
    .bind(&content)
    .bind(data.status.map(|s| s.as_str()))
    .bind(data.category_id)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate("Product slug already exists".into())
        } else {
            RepoError::from(e)
        }
    })?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }

    if let Some(variants) = replace_variants {
        variant::delete_for_product(&mut tx, id).await?;
        variant::insert_many(&mut tx, id, variants).await?;
    }

    tx.commit().await?;

    let product = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;
    let variants = variant::find_by_product(pool, id).await?;
    Ok((product, variants))
}

/// Hard delete a product and its variants.
///
/// Blocked while any order line item references the product or one of
/// its variants — order history keeps catalog identities alive.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let result = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if super::is_foreign_key_violation(&e) {
                RepoError::Referenced(format!(
                    "Product {id} is referenced by existing orders"
                ))
            } else {
                RepoError::from(e)
            }
        })?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    Ok(())
}
