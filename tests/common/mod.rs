//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use commerce_core::domain::{ProductId, VariantId};

/// Connect using DATABASE_URL, or None to skip the test.
pub async fn connect_db() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .ok()?;
    commerce_core::migrations::run_postgres(&pool).await.ok()?;
    Some(pool)
}

/// Random session token for guest carts.
pub fn random_session_token() -> String {
    format!("sess-{}", &Uuid::new_v4().to_string()[..8])
}

/// Insert a product and return its id.
pub async fn create_product(pool: &PgPool, name: &str, price_cents: i64, stock: i64) -> ProductId {
    let id = ProductId::new();
    sqlx::query(
        r#"
        INSERT INTO products (id, name, price_cents, stock_quantity, active)
        VALUES ($1, $2, $3, $4, TRUE)
        "#,
    )
    .bind(id.0)
    .bind(name)
    .bind(price_cents)
    .bind(stock)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Insert a variant for a product and return its id.
pub async fn create_variant(
    pool: &PgPool,
    product_id: ProductId,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> VariantId {
    let id = VariantId::new();
    sqlx::query(
        r#"
        INSERT INTO product_variants (id, product_id, name, price_cents, stock_quantity, active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        "#,
    )
    .bind(id.0)
    .bind(product_id.0)
    .bind(name)
    .bind(price_cents)
    .bind(stock)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Change a product's live price directly (catalog write, not inventory).
pub async fn set_product_price(pool: &PgPool, product_id: ProductId, price_cents: i64) {
    sqlx::query(r#"UPDATE products SET price_cents = $2, updated_at = NOW() WHERE id = $1"#)
        .bind(product_id.0)
        .bind(price_cents)
        .execute(pool)
        .await
        .unwrap();
}

/// Read the raw on-hand quantity for a variant.
pub async fn variant_stock(pool: &PgPool, variant_id: VariantId) -> i64 {
    let row: (i64,) =
        sqlx::query_as(r#"SELECT stock_quantity FROM product_variants WHERE id = $1"#)
            .bind(variant_id.0)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

/// Read the raw on-hand quantity for a product.
pub async fn product_stock(pool: &PgPool, product_id: ProductId) -> i64 {
    let row: (i64,) = sqlx::query_as(r#"SELECT stock_quantity FROM products WHERE id = $1"#)
        .bind(product_id.0)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

/// Count ledger rows for a product.
pub async fn ledger_count(pool: &PgPool, product_id: ProductId) -> i64 {
    let row: (i64,) =
        sqlx::query_as(r#"SELECT COUNT(*) FROM inventory_logs WHERE product_id = $1"#)
            .bind(product_id.0)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

/// Sum of ledger deltas for a product.
pub async fn ledger_delta_sum(pool: &PgPool, product_id: ProductId) -> i64 {
    let row: (i64,) = sqlx::query_as(
        r#"SELECT COALESCE(SUM(delta), 0)::BIGINT FROM inventory_logs WHERE product_id = $1"#,
    )
    .bind(product_id.0)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

/// Count orders referencing a product through order_items.
pub async fn order_count_for_product(pool: &PgPool, product_id: ProductId) -> i64 {
    let row: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(DISTINCT order_id) FROM order_items WHERE product_id = $1"#,
    )
    .bind(product_id.0)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}
