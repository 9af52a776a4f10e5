//! Order Model
//!
//! Orders and their line items are write-once: line items snapshot
//! name/variant name/SKU/unit price at creation time so later catalog
//! edits never retroactively change history. Status transitions are
//! driven by external payment/fulfilment events.

use serde::{Deserialize, Serialize};

/// Order status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "PAID" => Some(OrderStatus::Paid),
            "PROCESSING" => Some(OrderStatus::Processing),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    /// Idempotency token from the payment layer; unique when present
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    /// All amounts in minor currency units
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
    pub currency: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line item entity — immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    /// Unit price snapshot in minor units, taken from the variant at
    /// order time — never from client input
    pub price: i64,
    /// Product name snapshot
    pub name: String,
    /// Variant display name snapshot
    pub variant_name: Option<String>,
    /// SKU snapshot
    pub sku: String,
}

/// Order event entity — append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub id: i64,
    pub order_id: i64,
    /// Human-readable status label, e.g. "Order Placed"
    pub status: String,
    pub timestamp: i64,
}

/// One client-submitted cart line. Carries no price on purpose: unit
/// prices are always re-derived from the persisted variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    /// Mandatory for a valid order; optional here so validation can
    /// reject the whole cart with a precise message
    pub variant_id: Option<i64>,
    pub quantity: i64,
}

/// Create order payload (service-to-service)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub user_id: String,
    pub email: Option<String>,
    /// Idempotency token; retried submissions with the same reference
    /// return the original order
    pub payment_reference: Option<String>,
    /// Trusted caller-supplied amounts in minor units
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub shipping: i64,
    pub currency: Option<String>,
    pub status: Option<OrderStatus>,
    #[serde(alias = "products")]
    pub items: Vec<CartLine>,
}

/// Full order detail (header + lines + timeline)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLineItem>,
    pub events: Vec<OrderEvent>,
    /// Display-formatted total, e.g. "24.88"
    pub total_display: String,
}

/// Monthly order statistics bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMonthlyStats {
    pub month: String,
    pub total: i64,
    pub successful: i64,
    /// Revenue of successful orders in minor units
    pub revenue: i64,
}
