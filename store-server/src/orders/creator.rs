//! Order Integrity Builder
//!
//! Converts a client-submitted cart into a durably persisted,
//! price-verified, idempotent order. Unit prices always come from the
//! persisted variant rows — the request type carries no client price to
//! trust. All validation happens before the first write; persistence is
//! a single transaction.

use sqlx::SqlitePool;

use crate::db::repository::order::{self, NewLineItem, NewOrder};
use crate::db::repository::{RepoError, variant};
use crate::orders::IdentityClient;
use crate::utils::{AppError, AppResult};
use shared::models::{CartLine, Order, OrderCreate, OrderStatus};

/// Maximum allowed quantity per cart line
const MAX_QUANTITY: i64 = 9999;

/// Result of a checkout call
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// True when an existing order was returned for a repeated
    /// payment reference instead of creating a new one
    pub replayed: bool,
}

/// Create an order, or replay the existing one for a known payment
/// reference.
///
/// Sequential, fail-fast protocol:
/// 1. idempotency lookup by payment reference
/// 2. whole-cart validation (no partial orders)
/// 3. unit price derivation from persisted variants
/// 4. totals (tax/shipping are trusted caller inputs)
/// 5. atomic persistence; a lost insert race on the reference is
///    converted into a replay, never an error
pub async fn create_order(
    pool: &SqlitePool,
    identity: Option<&IdentityClient>,
    default_currency: &str,
    input: OrderCreate,
) -> AppResult<CheckoutOutcome> {
    // 1. Idempotency check — before any other validation
    if let Some(reference) = input.payment_reference.as_deref() {
        if let Some(existing) = order::find_by_payment_reference(pool, reference).await? {
            tracing::info!(
                order_id = existing.id,
                payment_reference = %reference,
                "Order already exists for payment reference, replaying"
            );
            return Ok(CheckoutOutcome {
                order: existing,
                replayed: true,
            });
        }
    }

    // 2. Whole-cart validation, then price derivation — no writes yet
    if input.user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }
    if input.items.is_empty() {
        return Err(AppError::validation("cart cannot be empty"));
    }
    if input.tax < 0 || input.shipping < 0 {
        return Err(AppError::validation("tax and shipping must be non-negative"));
    }

    let mut lines = Vec::with_capacity(input.items.len());
    for (index, line) in input.items.iter().enumerate() {
        lines.push(resolve_line(pool, index, line).await?);
    }

    // 4. Totals — subtotal from persisted prices only
    let mut subtotal: i64 = 0;
    for line in &lines {
        let line_total = line
            .price
            .checked_mul(line.quantity)
            .ok_or_else(|| AppError::validation("order total overflows"))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| AppError::validation("order total overflows"))?;
    }
    let total = subtotal
        .checked_add(input.tax)
        .and_then(|t| t.checked_add(input.shipping))
        .ok_or_else(|| AppError::validation("order total overflows"))?;

    // Best-effort email enrichment; never blocks the order
    let mut email = input.email.clone().filter(|e| !e.trim().is_empty());
    if email.is_none()
        && let Some(client) = identity
    {
        email = client.fetch_email(&input.user_id).await;
    }

    let header = NewOrder {
        user_id: input.user_id.clone(),
        email,
        payment_reference: input.payment_reference.clone(),
        status: input.status.unwrap_or(OrderStatus::Pending),
        subtotal,
        tax: input.tax,
        shipping: input.shipping,
        total,
        currency: input
            .currency
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_currency.to_string()),
    };

    // 5. Atomic persistence
    match order::create(pool, header, &lines).await {
        Ok(created) => {
            tracing::info!(
                order_id = created.id,
                user_id = %created.user_id,
                total = created.total,
                "Order created"
            );
            Ok(CheckoutOutcome {
                order: created,
                replayed: false,
            })
        }
        // Two calls raced on the same payment reference and this one
        // lost the insert — the winner's order is the order.
        Err(RepoError::Duplicate(reference)) => {
            let existing = order::find_by_payment_reference(pool, &reference)
                .await?
                .ok_or_else(|| {
                    AppError::internal(format!(
                        "Order insert for reference '{reference}' hit the unique index but no row was found"
                    ))
                })?;
            tracing::info!(
                order_id = existing.id,
                payment_reference = %reference,
                "Concurrent order creation detected, replaying existing order"
            );
            Ok(CheckoutOutcome {
                order: existing,
                replayed: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate one cart line against the catalog and snapshot its fields
async fn resolve_line(pool: &SqlitePool, index: usize, line: &CartLine) -> AppResult<NewLineItem> {
    let variant_id = line.variant_id.ok_or_else(|| {
        AppError::validation(format!(
            "cart line {index} for product {} has no variant selected",
            line.product_id
        ))
    })?;
    if line.quantity < 1 {
        return Err(AppError::validation(format!(
            "cart line {index} has non-positive quantity"
        )));
    }
    if line.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "cart line {index} exceeds the maximum quantity of {MAX_QUANTITY}"
        )));
    }

    let (variant, product_name) = variant::find_with_product_name(pool, variant_id)
        .await?
        .ok_or_else(|| {
            AppError::validation(format!("variant {variant_id} not found (cart line {index})"))
        })?;
    if variant.product_id != line.product_id {
        return Err(AppError::validation(format!(
            "variant {variant_id} does not belong to product {} (cart line {index})",
            line.product_id
        )));
    }

    // 3. Unit price is the persisted variant price, nothing else
    Ok(NewLineItem {
        product_id: variant.product_id,
        variant_id: variant.id,
        quantity: line.quantity,
        price: variant.price,
        name: product_name,
        variant_name: Some(variant.name),
        sku: variant.sku,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{order, product};
    use shared::models::{
        Axis, ListingConfig, ProductCreate, ProductImages, ProductStatus, VariantCreate,
    };
    use sqlx::sqlite::SqlitePoolOptions;

    /// In-memory SQLite pool running the real migrations
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn protein_powder_create() -> ProductCreate {
        ProductCreate {
            slug: "protein-powder".to_string(),
            name: "Protein Powder".to_string(),
            tagline: None,
            short_description: None,
            description: None,
            attributes: vec![
                Axis {
                    name: "Flavor".to_string(),
                    values: vec!["Chocolate".to_string(), "Vanilla".to_string()],
                },
                Axis {
                    name: "Size".to_string(),
                    values: vec!["500g".to_string(), "1kg".to_string()],
                },
            ],
            images: ProductImages {
                main: "main.jpg".to_string(),
                gallery: Vec::new(),
            },
            listing_config: ListingConfig {
                expose_variants_as_cards: true,
            },
            content: None,
            status: ProductStatus::Published,
            category_id: None,
        }
    }

    fn variant_create(flavor: &str, size: &str, price: i64) -> VariantCreate {
        VariantCreate {
            name: format!("Protein Powder - {flavor} / {size}"),
            sku: format!("PROTEIN-POWDER-{flavor}-{size}").to_uppercase(),
            price,
            original_price: None,
            stock: 50,
            attributes: [
                ("Flavor".to_string(), flavor.to_string()),
                ("Size".to_string(), size.to_string()),
            ]
            .into_iter()
            .collect(),
            image: None,
            description: None,
        }
    }

    /// Seed the catalog and return (product_id, vanilla_1kg_variant_id)
    async fn seed(pool: &SqlitePool) -> (i64, i64) {
        let variants = vec![
            variant_create("Chocolate", "500g", 999),
            variant_create("Chocolate", "1kg", 999),
            variant_create("Vanilla", "500g", 999),
            variant_create("Vanilla", "1kg", 1199),
        ];
        let (product, variants) = product::create(pool, protein_powder_create(), &variants)
            .await
            .unwrap();
        let vanilla_1kg = variants
            .iter()
            .find(|v| v.attributes["Flavor"] == "Vanilla" && v.attributes["Size"] == "1kg")
            .unwrap();
        (product.id, vanilla_1kg.id)
    }

    fn order_input(
        product_id: i64,
        variant_id: Option<i64>,
        quantity: i64,
        reference: Option<&str>,
    ) -> OrderCreate {
        OrderCreate {
            user_id: "user_1".to_string(),
            email: Some("shopper@example.com".to_string()),
            payment_reference: reference.map(str::to_string),
            tax: 50,
            shipping: 40,
            currency: None,
            status: None,
            items: vec![CartLine {
                product_id,
                variant_id,
                quantity,
            }],
        }
    }

    async fn order_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn row_counts(pool: &SqlitePool) -> (i64, i64, i64) {
        let orders = order_count(pool).await;
        let items = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_item")
            .fetch_one(pool)
            .await
            .unwrap();
        let events = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_event")
            .fetch_one(pool)
            .await
            .unwrap();
        (orders, items, events)
    }

    #[tokio::test]
    async fn test_totals_derive_from_persisted_prices() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        let outcome = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(vanilla_1kg), 2, Some("pay_scenario")),
        )
        .await
        .unwrap();

        assert!(!outcome.replayed);
        assert_eq!(outcome.order.subtotal, 2398);
        assert_eq!(outcome.order.total, 2488);
        assert_eq!(outcome.order.currency, "INR");
        assert_eq!(outcome.order.status, OrderStatus::Pending);

        let items = order::find_items(&pool, outcome.order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, 1199);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].name, "Protein Powder");
        assert_eq!(items[0].sku, "PROTEIN-POWDER-VANILLA-1KG");

        let events = order::find_events(&pool, outcome.order.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, order::EVENT_ORDER_PLACED);
    }

    #[tokio::test]
    async fn test_idempotent_replay_returns_same_order() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        let first = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(vanilla_1kg), 2, Some("pay_abc")),
        )
        .await
        .unwrap();
        let second = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(vanilla_1kg), 2, Some("pay_abc")),
        )
        .await
        .unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(order_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_insert_race_on_reference_becomes_replay() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        // First order takes the reference
        let first = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(vanilla_1kg), 1, Some("pay_race")),
        )
        .await
        .unwrap();

        // Simulate the losing side of the race: the header insert itself
        // hits the unique index
        let header = NewOrder {
            user_id: "user_2".to_string(),
            email: None,
            payment_reference: Some("pay_race".to_string()),
            status: OrderStatus::Pending,
            subtotal: 999,
            tax: 0,
            shipping: 0,
            total: 999,
            currency: "INR".to_string(),
        };
        let err = order::create(&pool, header, &[]).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(ref r) if r == "pay_race"));

        // Exactly one order with the reference, and the winner's id
        let existing = order::find_by_payment_reference(&pool, "pay_race")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.id, first.order.id);
        assert_eq!(order_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_line_without_variant_rejects_whole_order() {
        let pool = test_pool().await;
        let (product_id, _) = seed(&pool).await;

        let err = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, None, 1, Some("pay_novariant")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Zero rows written: order, items, events all absent
        assert_eq!(row_counts(&pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_missing_variant_aborts_without_writes() {
        let pool = test_pool().await;
        let (product_id, _) = seed(&pool).await;

        let err = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(987654), 1, None),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(row_counts(&pool).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_variant_claimed_under_wrong_product_rejected() {
        let pool = test_pool().await;
        let (_, vanilla_1kg) = seed(&pool).await;

        let err = create_order(
            &pool,
            None,
            "INR",
            order_input(123456, Some(vanilla_1kg), 1, None),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(order_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let pool = test_pool().await;
        seed(&pool).await;

        let mut input = order_input(1, Some(1), 1, None);
        input.items.clear();
        let err = create_order(&pool, None, "INR", input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        for quantity in [0, -3, MAX_QUANTITY + 1] {
            let err = create_order(
                &pool,
                None,
                "INR",
                order_input(product_id, Some(vanilla_1kg), quantity, None),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(order_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_negative_tax_or_shipping_rejected() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        let mut input = order_input(product_id, Some(vanilla_1kg), 1, None);
        input.tax = -1;
        let err = create_order(&pool, None, "INR", input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_caller_status_and_currency_are_honored() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        let mut input = order_input(product_id, Some(vanilla_1kg), 1, None);
        input.status = Some(OrderStatus::Paid);
        input.currency = Some("EUR".to_string());
        let outcome = create_order(&pool, None, "INR", input).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Paid);
        assert_eq!(outcome.order.currency, "EUR");
    }

    #[tokio::test]
    async fn test_snapshots_survive_catalog_edits() {
        let pool = test_pool().await;
        let (product_id, vanilla_1kg) = seed(&pool).await;

        let outcome = create_order(
            &pool,
            None,
            "INR",
            order_input(product_id, Some(vanilla_1kg), 1, None),
        )
        .await
        .unwrap();

        // Rename the product after the fact
        product::update(
            &pool,
            product_id,
            shared::models::ProductUpdate {
                name: Some("Renamed Powder".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let items = order::find_items(&pool, outcome.order.id).await.unwrap();
        assert_eq!(items[0].name, "Protein Powder");
    }
}
