//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::db::repository::order;
use crate::orders::create_order;
use crate::utils::{AppError, AppResult};
use shared::models::{Order, OrderCreate, OrderDetail, OrderMonthlyStats, OrderStatus};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// Response of the internal creation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateResponse {
    pub success: bool,
    pub message: String,
    pub order_id: i64,
}

/// POST /orders/internal/create - 服务间订单创建 (幂等)
///
/// 201 on creation, 200 when the payment reference replays an existing
/// order.
pub async fn create_internal(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<OrderCreateResponse>)> {
    let outcome = create_order(
        &state.pool,
        state.identity.as_ref(),
        &state.config.default_currency,
        payload,
    )
    .await?;

    let (status, message) = if outcome.replayed {
        (StatusCode::OK, "Order already exists")
    } else {
        (StatusCode::CREATED, "Order created successfully")
    };

    Ok((
        status,
        Json(OrderCreateResponse {
            success: true,
            message: message.to_string(),
            order_id: outcome.order.id,
        }),
    ))
}

/// GET /orders - 订单列表 (管理端)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order::find_all(&state.pool, query.limit.clamp(1, 500)).await?;
    Ok(Json(orders))
}

/// GET /orders/user/:user_id - 用户订单历史
pub async fn list_by_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order::find_by_user(&state.pool, &user_id).await?;
    Ok(Json(orders))
}

/// GET /orders/:id - 订单详情 (含行项目与事件时间线)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let header = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;
    let items = order::find_items(&state.pool, id).await?;
    let events = order::find_events(&state.pool, id).await?;
    let total_display = shared::money::format_minor(header.total);

    Ok(Json(OrderDetail {
        order: header,
        items,
        events,
        total_display,
    }))
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// GET /orders/stats - 近 6 个月订单统计
pub async fn stats(State(state): State<ServerState>) -> AppResult<Json<Vec<OrderMonthlyStats>>> {
    let now = Utc::now();
    let buckets: Vec<(i32, u32)> = (0..6)
        .rev()
        .map(|back| shift_month(now.year(), now.month(), back))
        .collect();

    // Fetch everything since the first day of the oldest bucket and
    // aggregate in one pass
    let (oldest_year, oldest_month) = buckets[0];
    let since = Utc
        .with_ymd_and_hms(oldest_year, oldest_month, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0);
    let orders = order::find_since(&state.pool, since).await?;

    let results = buckets
        .into_iter()
        .map(|(year, month)| {
            let in_bucket = orders.iter().filter(|o| {
                DateTime::<Utc>::from_timestamp_millis(o.created_at)
                    .map(|dt| dt.year() == year && dt.month() == month)
                    .unwrap_or(false)
            });

            let mut total = 0;
            let mut successful = 0;
            let mut revenue = 0;
            for o in in_bucket {
                total += 1;
                if is_successful(o) {
                    successful += 1;
                    revenue += o.total;
                }
            }

            OrderMonthlyStats {
                month: MONTH_NAMES[(month - 1) as usize].to_string(),
                total,
                successful,
                revenue,
            }
        })
        .collect();

    Ok(Json(results))
}

fn is_successful(order: &Order) -> bool {
    matches!(
        order.status,
        OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
    )
}

/// Walk `back` months backwards from (year, month)
fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 - back as i32;
    (zero_based.div_euclid(12), (zero_based.rem_euclid(12) + 1) as u32)
}
