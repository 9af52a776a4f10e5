//! Category API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::core::ServerState;
use crate::db::repository::category;
use crate::utils::{AppError, AppResult};
use shared::models::{Category, CategoryCreate};

/// GET /categories - 获取所有分类
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    let categories = category::find_all(&state.pool).await?;
    Ok(Json(categories))
}

/// POST /categories - 创建分类
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<(StatusCode, Json<Category>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Category name is required"));
    }
    let created = category::create(&state.pool, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /categories/:id - 删除分类
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let deleted = category::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Category {id}")));
    }
    Ok(Json(true))
}
