//! Variant Repository

use super::{RepoError, RepoResult, is_unique_violation};
use shared::models::{Variant, VariantAttributes, VariantCreate};
use sqlx::{Sqlite, SqlitePool, Transaction};

const VARIANT_SELECT: &str = "SELECT id, product_id, name, sku, price, original_price, stock, \
     attributes, image, description, position, created_at, updated_at FROM variant";

/// Raw variant row — `attributes` is a JSON TEXT column
#[derive(sqlx::FromRow)]
pub(crate) struct VariantRow {
    id: i64,
    product_id: i64,
    name: String,
    sku: String,
    price: i64,
    original_price: Option<i64>,
    stock: i64,
    attributes: String,
    image: Option<String>,
    description: Option<String>,
    position: i32,
    created_at: i64,
    updated_at: i64,
}

impl VariantRow {
    pub(crate) fn into_variant(self) -> RepoResult<Variant> {
        let attributes: VariantAttributes = serde_json::from_str(&self.attributes)
            .map_err(|e| RepoError::Database(format!("Corrupt attributes on variant {}: {e}", self.id)))?;
        Ok(Variant {
            id: self.id,
            product_id: self.product_id,
            name: self.name,
            sku: self.sku,
            price: self.price,
            original_price: self.original_price,
            stock: self.stock,
            attributes,
            image: self.image,
            description: self.description,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Variant>> {
    let sql = format!("{VARIANT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, VariantRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(VariantRow::into_variant).transpose()
}

/// All variants of a product in persisted order
pub async fn find_by_product(pool: &SqlitePool, product_id: i64) -> RepoResult<Vec<Variant>> {
    let sql = format!("{VARIANT_SELECT} WHERE product_id = ? ORDER BY position, id");
    let rows = sqlx::query_as::<_, VariantRow>(&sql)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(VariantRow::into_variant).collect()
}

/// Variant together with its owning product's name (for order snapshots)
pub async fn find_with_product_name(
    pool: &SqlitePool,
    id: i64,
) -> RepoResult<Option<(Variant, String)>> {
    #[derive(sqlx::FromRow)]
    struct Joined {
        #[sqlx(flatten)]
        variant: VariantRow,
        product_name: String,
    }

    let sql = "SELECT v.id, v.product_id, v.name, v.sku, v.price, v.original_price, v.stock, \
         v.attributes, v.image, v.description, v.position, v.created_at, v.updated_at, \
         p.name AS product_name \
         FROM variant v JOIN product p ON v.product_id = p.id WHERE v.id = ?";
    let row = sqlx::query_as::<_, Joined>(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(j) => Ok(Some((j.variant.into_variant()?, j.product_name))),
        None => Ok(None),
    }
}

/// Insert a batch of variants for a product inside an open transaction.
///
/// Positions follow slice order. A duplicate SKU surfaces as
/// [`RepoError::Duplicate`] naming the offending SKU.
pub(crate) async fn insert_many(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    variants: &[VariantCreate],
) -> RepoResult<Vec<i64>> {
    let now = shared::util::now_millis();
    let mut ids = Vec::with_capacity(variants.len());

    for (position, v) in variants.iter().enumerate() {
        if v.stock < 0 {
            return Err(RepoError::Validation(format!(
                "stock must be non-negative for SKU {}",
                v.sku
            )));
        }
        let id = shared::util::snowflake_id();
        let attributes = serde_json::to_string(&v.attributes)
            .map_err(|e| RepoError::Validation(format!("Unserializable attributes: {e}")))?;

        sqlx::query(
            "INSERT INTO variant (id, product_id, name, sku, price, original_price, stock, \
             attributes, image, description, position, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        )
        .bind(id)
        .bind(product_id)
        .bind(&v.name)
        .bind(&v.sku)
        .bind(v.price)
        .bind(v.original_price)
        .bind(v.stock)
        .bind(&attributes)
        .bind(&v.image)
        .bind(&v.description)
        .bind(position as i32)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Duplicate(format!("SKU '{}' already exists", v.sku))
            } else {
                RepoError::from(e)
            }
        })?;
        ids.push(id);
    }

    Ok(ids)
}

/// Delete all variants of a product inside an open transaction.
///
/// Fails with [`RepoError::Referenced`] when any variant is pinned by an
/// order line item — variant identity is immutable once ordered.
pub(crate) async fn delete_for_product(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
) -> RepoResult<()> {
    sqlx::query("DELETE FROM variant WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if super::is_foreign_key_violation(&e) {
                RepoError::Referenced(format!(
                    "Variants of product {product_id} are referenced by existing orders"
                ))
            } else {
                RepoError::from(e)
            }
        })?;
    Ok(())
}
