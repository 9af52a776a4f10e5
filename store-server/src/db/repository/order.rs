//! Order Repository
//!
//! Order creation writes the header, line items and the initial event in
//! one transaction — partial orders are never visible to readers.

use super::{RepoError, RepoResult, is_unique_violation};
use shared::models::{Order, OrderEvent, OrderLineItem, OrderStatus};
use sqlx::SqlitePool;

/// First timeline entry of every order
pub const EVENT_ORDER_PLACED: &str = "Order Placed";

const ORDER_SELECT: &str = "SELECT id, user_id, email, payment_reference, status, subtotal, \
     tax, shipping, total, currency, created_at, updated_at FROM orders";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: String,
    email: Option<String>,
    payment_reference: Option<String>,
    status: String,
    subtotal: i64,
    tax: i64,
    shipping: i64,
    total: i64,
    currency: String,
    created_at: i64,
    updated_at: i64,
}

impl OrderRow {
    fn into_order(self) -> RepoResult<Order> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            RepoError::Database(format!("Unknown status '{}' on order {}", self.status, self.id))
        })?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            email: self.email,
            payment_reference: self.payment_reference,
            status,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            currency: self.currency,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// New order header (validated, totals already derived)
pub struct NewOrder {
    pub user_id: String,
    pub email: Option<String>,
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
    pub currency: String,
}

/// New line item with snapshots already resolved against the catalog
pub struct NewLineItem {
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    /// Unit price snapshot in minor units
    pub price: i64,
    pub name: String,
    pub variant_name: Option<String>,
    pub sku: String,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(OrderRow::into_order).transpose()
}

/// Idempotency lookup — at most one order can carry a given reference
pub async fn find_by_payment_reference(
    pool: &SqlitePool,
    reference: &str,
) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE payment_reference = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(reference)
        .fetch_optional(pool)
        .await?;
    row.map(OrderRow::into_order).transpose()
}

pub async fn find_all(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} ORDER BY created_at DESC, id DESC LIMIT ?");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderLineItem>> {
    let rows = sqlx::query_as::<_, OrderLineItem>(
        "SELECT id, order_id, product_id, variant_id, quantity, price, name, variant_name, sku \
         FROM order_item WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_events(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderEvent>> {
    let rows = sqlx::query_as::<_, OrderEvent>(
        "SELECT id, order_id, status, timestamp FROM order_event \
         WHERE order_id = ? ORDER BY timestamp, id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Persist an order atomically: header + line items + "Order Placed"
/// event, all-or-nothing.
///
/// A UNIQUE violation on `payment_reference` is reported as
/// [`RepoError::Duplicate`] carrying the reference, so the caller can
/// treat a lost insert race as an idempotent replay.
pub async fn create(
    pool: &SqlitePool,
    header: NewOrder,
    items: &[NewLineItem],
) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let order_id = shared::util::snowflake_id();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders (id, user_id, email, payment_reference, status, subtotal, tax, \
         shipping, total, currency, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    )
    .bind(order_id)
    .bind(&header.user_id)
    .bind(&header.email)
    .bind(&header.payment_reference)
    .bind(header.status.as_str())
    .bind(header.subtotal)
    .bind(header.tax)
    .bind(header.shipping)
    .bind(header.total)
    .bind(&header.currency)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(header.payment_reference.clone().unwrap_or_default())
        } else {
            RepoError::from(e)
        }
    })?;

    for item in items {
        let item_id = shared::util::snowflake_id();
        sqlx::query(
            "INSERT INTO order_item (id, order_id, product_id, variant_id, quantity, price, \
             name, variant_name, sku) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(item_id)
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.quantity)
        .bind(item.price)
        .bind(&item.name)
        .bind(&item.variant_name)
        .bind(&item.sku)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO order_event (id, order_id, status, timestamp) VALUES (?1, ?2, ?3, ?4)")
        .bind(shared::util::snowflake_id())
        .bind(order_id)
        .bind(EVENT_ORDER_PLACED)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Orders created on or after `since_millis` (for the stats endpoint)
pub async fn find_since(pool: &SqlitePool, since_millis: i64) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE created_at >= ? ORDER BY created_at");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(since_millis)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}
