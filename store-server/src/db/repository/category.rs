//! Category Repository

use super::{RepoError, RepoResult, is_unique_violation};
use shared::models::{Category, CategoryCreate};
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, created_at, updated_at FROM category ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> RepoResult<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, created_at, updated_at FROM category WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(
        "SELECT id, name, slug, created_at, updated_at FROM category WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let slug = match data.slug {
        Some(s) if !s.trim().is_empty() => s,
        _ => shared::util::slugify(&data.name),
    };
    if slug.is_empty() {
        return Err(RepoError::Validation("category slug cannot be empty".into()));
    }

    sqlx::query(
        "INSERT INTO category (id, name, slug, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&slug)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!("Category slug '{slug}' already exists"))
        } else {
            e.into()
        }
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM category WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if super::is_foreign_key_violation(&e) {
                RepoError::Referenced(format!("Category {id} is still assigned to products"))
            } else {
                RepoError::from(e)
            }
        })?;
    Ok(rows.rows_affected() > 0)
}
