//! End-to-end flow over an in-memory database: generate a product from
//! axes, project the listing, resolve a variant and place an idempotent
//! order.

use std::collections::BTreeMap;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use shared::models::{
    Axis, CartLine, ListingConfig, OrderCreate, ProductCreate, ProductImages, ProductStatus,
};
use store_server::catalog::{
    EmptyAxes, GenerationInput, ProductRef, SortKey, VariantOverride, generate_variants, listing,
    pick_variant, Selection, effective_view,
};
use store_server::db::repository::{order, product, variant};
use store_server::orders::create_order;

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

/// Seed the catalog the way POST /products/generate does: run the
/// combinator over the axes, then persist product + drafts atomically.
async fn seed_protein_powder(pool: &SqlitePool) -> i64 {
    let axes = vec![
        Axis {
            name: "Flavor".to_string(),
            values: vec!["Chocolate".to_string(), "Vanilla".to_string()],
        },
        Axis {
            name: "Size".to_string(),
            values: vec!["500g".to_string(), "1kg".to_string()],
        },
    ];
    let overrides = vec![VariantOverride {
        when: [
            ("Flavor".to_string(), "Vanilla".to_string()),
            ("Size".to_string(), "1kg".to_string()),
        ]
        .into_iter()
        .collect(),
        price: Some(1199),
        original_price: None,
        stock: None,
    }];
    let image_map = BTreeMap::new();

    let drafts = generate_variants(
        &GenerationInput {
            product_name: "Protein Powder",
            sku_prefix: "protein-powder",
            base_price: 999,
            base_stock: 50,
            axes: &axes,
            overrides: &overrides,
            image_map: &image_map,
            fallback_image: Some("main.jpg"),
        },
        EmptyAxes::Reject,
        256,
    )
    .unwrap();
    assert_eq!(drafts.len(), 4);

    let data = ProductCreate {
        slug: "protein-powder".to_string(),
        name: "Protein Powder".to_string(),
        tagline: None,
        short_description: None,
        description: None,
        attributes: axes,
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
    };
    let (created, variants) = product::create(pool, data, &drafts).await.unwrap();
    assert_eq!(variants.len(), 4);
    created.id
}

#[tokio::test]
async fn test_full_catalog_and_checkout_flow() {
    let pool = test_pool().await;
    let product_id = seed_protein_powder(&pool).await;

    // --- Listing: 4 virtual items, zero base rows ---
    let candidates = product::list_published(&pool, None, None).await.unwrap();
    let mut items = listing::project(candidates);
    listing::sort_items(&mut items, SortKey::parse(None));

    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i.variant_id.is_some()));
    assert!(items.iter().all(|i| i.id.starts_with("protein-powder-v-")));
    assert!(items.iter().all(|i| i.slug == "protein-powder"));

    // Every virtual id round-trips through the reference parser
    for item in &items {
        let parsed: ProductRef = item.id.parse().unwrap();
        match parsed {
            ProductRef::Virtual { variant_id, .. } => {
                assert_eq!(Some(variant_id), item.variant_id)
            }
            other => panic!("expected virtual ref, got {other:?}"),
        }
    }

    // The override only touched Vanilla/1kg
    let prices: Vec<i64> = items.iter().filter_map(|i| i.price).collect();
    assert_eq!(prices.iter().filter(|p| **p == 1199).count(), 1);
    assert_eq!(prices.iter().filter(|p| **p == 999).count(), 3);

    // --- Resolution: attribute selection finds the overridden variant ---
    let product = product::find_by_id(&pool, product_id).await.unwrap().unwrap();
    let variants = variant::find_by_product(&pool, product_id).await.unwrap();
    let selection = Selection {
        variant_id: None,
        attributes: [
            ("Flavor".to_string(), "Vanilla".to_string()),
            ("Size".to_string(), "1kg".to_string()),
        ]
        .into_iter()
        .collect(),
    };
    let vanilla_1kg = pick_variant(&product, &variants, &selection)
        .unwrap()
        .unwrap();
    assert_eq!(vanilla_1kg.price, 1199);
    assert_eq!(vanilla_1kg.sku, "PROTEIN-POWDER-VANILLA-1KG");

    let view = effective_view(&product, Some(vanilla_1kg));
    assert_eq!(view.price, Some(1199));
    assert_eq!(view.id, format!("protein-powder-v-{}", vanilla_1kg.id));

    // --- Checkout: qty 2, tax 50, shipping 40 → 2398 / 2488 ---
    let input = OrderCreate {
        user_id: "user_42".to_string(),
        email: None,
        payment_reference: Some("pay_abc".to_string()),
        tax: 50,
        shipping: 40,
        currency: None,
        status: None,
        items: vec![CartLine {
            product_id,
            variant_id: Some(vanilla_1kg.id),
            quantity: 2,
        }],
    };
    let first = create_order(&pool, None, "INR", input.clone()).await.unwrap();
    assert!(!first.replayed);
    assert_eq!(first.order.subtotal, 2398);
    assert_eq!(first.order.total, 2488);

    // --- Idempotent replay: same reference → same order, one row ---
    let second = create_order(&pool, None, "INR", input).await.unwrap();
    assert!(second.replayed);
    assert_eq!(second.order.id, first.order.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // The timeline opens with "Order Placed"
    let events = order::find_events(&pool, first.order.id).await.unwrap();
    assert_eq!(events.first().map(|e| e.status.as_str()), Some("Order Placed"));
}

#[tokio::test]
async fn test_forged_client_prices_are_ignored() {
    let pool = test_pool().await;
    let product_id = seed_protein_powder(&pool).await;
    let variants = variant::find_by_product(&pool, product_id).await.unwrap();
    let vanilla_1kg = variants
        .iter()
        .find(|v| v.attributes["Flavor"] == "Vanilla" && v.attributes["Size"] == "1kg")
        .unwrap();

    // A tampered cart submission: price/subtotal/total fields carry 1.
    // None of them exist on the request type, so they cannot reach the
    // persisted order.
    let raw = serde_json::json!({
        "userId": "user_42",
        "paymentReference": "pay_forged",
        "tax": 50,
        "shipping": 40,
        "subtotal": 1,
        "total": 1,
        "products": [{
            "productId": product_id,
            "variantId": vanilla_1kg.id,
            "quantity": 2,
            "price": 1
        }]
    });
    let input: OrderCreate = serde_json::from_value(raw).unwrap();

    let outcome = create_order(&pool, None, "INR", input).await.unwrap();
    assert_eq!(outcome.order.subtotal, 2398);
    assert_eq!(outcome.order.total, 2488);

    let items = order::find_items(&pool, outcome.order.id).await.unwrap();
    assert_eq!(items[0].price, 1199);
}

#[tokio::test]
async fn test_deleting_ordered_product_is_blocked() {
    let pool = test_pool().await;
    let product_id = seed_protein_powder(&pool).await;
    let variants = variant::find_by_product(&pool, product_id).await.unwrap();

    create_order(
        &pool,
        None,
        "INR",
        OrderCreate {
            user_id: "user_42".to_string(),
            email: None,
            payment_reference: None,
            tax: 0,
            shipping: 0,
            currency: None,
            status: None,
            items: vec![CartLine {
                product_id,
                variant_id: Some(variants[0].id),
                quantity: 1,
            }],
        },
    )
    .await
    .unwrap();

    // Order history pins the catalog rows
    let err = product::delete(&pool, product_id).await.unwrap_err();
    assert!(matches!(
        err,
        store_server::db::repository::RepoError::Referenced(_)
    ));
}
