//! Shared stock-row helpers used by the cart store, inventory ledger and
//! order store.
//!
//! Stock lives on `products.stock_quantity` or, when a line references a
//! variant, on `product_variants.stock_quantity`. All writers go through
//! these helpers inside a transaction; the quantity column is never updated
//! elsewhere.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{InventoryLogEntry, ProductId, StockMeta, VariantId};
use crate::infra::{CommerceError, Result};

/// Live catalog data for one product or variant.
#[derive(Debug, Clone)]
pub(crate) struct LiveItem {
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

/// Load name, live price and on-hand stock for an active product/variant.
///
/// A variant must belong to the given product; a missing or inactive row
/// maps to the not-found family.
pub(crate) async fn live_item(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
) -> Result<LiveItem> {
    match variant_id {
        Some(vid) => {
            let row: Option<(String, i64, i64, bool)> = sqlx::query_as(
                r#"
                SELECT v.name, v.price_cents, v.stock_quantity, v.active AND p.active
                FROM product_variants v
                JOIN products p ON p.id = v.product_id
                WHERE v.id = $1 AND v.product_id = $2
                "#,
            )
            .bind(vid.0)
            .bind(product_id.0)
            .fetch_optional(&mut **tx)
            .await?;

            match row {
                Some((name, price_cents, stock_quantity, true)) => Ok(LiveItem {
                    name,
                    price_cents,
                    stock_quantity,
                }),
                _ => Err(CommerceError::VariantNotFound(vid)),
            }
        }
        None => {
            let row: Option<(String, i64, i64, bool)> = sqlx::query_as(
                r#"
                SELECT name, price_cents, stock_quantity, active
                FROM products
                WHERE id = $1
                "#,
            )
            .bind(product_id.0)
            .fetch_optional(&mut **tx)
            .await?;

            match row {
                Some((name, price_cents, stock_quantity, true)) => Ok(LiveItem {
                    name,
                    price_cents,
                    stock_quantity,
                }),
                _ => Err(CommerceError::ProductNotFound(product_id)),
            }
        }
    }
}

/// Lock the stock row and return the current on-hand quantity.
pub(crate) async fn lock_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
) -> Result<i64> {
    let row: Option<(i64,)> = match variant_id {
        Some(vid) => {
            sqlx::query_as(
                r#"
                SELECT stock_quantity FROM product_variants
                WHERE id = $1 AND product_id = $2
                FOR UPDATE
                "#,
            )
            .bind(vid.0)
            .bind(product_id.0)
            .fetch_optional(&mut **tx)
            .await?
        }
        None => {
            sqlx::query_as(r#"SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE"#)
                .bind(product_id.0)
                .fetch_optional(&mut **tx)
                .await?
        }
    };

    match (row, variant_id) {
        (Some((qty,)), _) => Ok(qty),
        (None, Some(vid)) => Err(CommerceError::VariantNotFound(vid)),
        (None, None) => Err(CommerceError::ProductNotFound(product_id)),
    }
}

/// Decrement stock iff enough is on hand, returning the resulting quantity.
///
/// The `stock_quantity >= $n` predicate makes the check and write one
/// atomic statement: two concurrent decrements can never both pass on
/// stock that only covers one of them.
pub(crate) async fn conditional_decrement(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i64,
) -> Result<i64> {
    let row: Option<(i64,)> = match variant_id {
        Some(vid) => {
            sqlx::query_as(
                r#"
                UPDATE product_variants
                SET stock_quantity = stock_quantity - $3, updated_at = NOW()
                WHERE id = $1 AND product_id = $2 AND stock_quantity >= $3
                RETURNING stock_quantity
                "#,
            )
            .bind(vid.0)
            .bind(product_id.0)
            .bind(quantity)
            .fetch_optional(&mut **tx)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1 AND stock_quantity >= $2
                RETURNING stock_quantity
                "#,
            )
            .bind(product_id.0)
            .bind(quantity)
            .fetch_optional(&mut **tx)
            .await?
        }
    };

    if let Some((resulting,)) = row {
        return Ok(resulting);
    }

    // Distinguish a missing row from insufficient stock for the error.
    let available = live_item(tx, product_id, variant_id)
        .await
        .map(|item| item.stock_quantity)?;
    Err(CommerceError::InsufficientStock {
        product_id,
        variant_id,
        requested: quantity,
        available,
    })
}

/// Apply a signed delta unconditionally (used for restock paths where the
/// caller already holds the row lock or the delta is positive).
pub(crate) async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    delta: i64,
) -> Result<i64> {
    let row: Option<(i64,)> = match variant_id {
        Some(vid) => {
            sqlx::query_as(
                r#"
                UPDATE product_variants
                SET stock_quantity = stock_quantity + $3, updated_at = NOW()
                WHERE id = $1 AND product_id = $2
                RETURNING stock_quantity
                "#,
            )
            .bind(vid.0)
            .bind(product_id.0)
            .bind(delta)
            .fetch_optional(&mut **tx)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + $2, updated_at = NOW()
                WHERE id = $1
                RETURNING stock_quantity
                "#,
            )
            .bind(product_id.0)
            .bind(delta)
            .fetch_optional(&mut **tx)
            .await?
        }
    };

    match (row, variant_id) {
        (Some((resulting,)), _) => Ok(resulting),
        (None, Some(vid)) => Err(CommerceError::VariantNotFound(vid)),
        (None, None) => Err(CommerceError::ProductNotFound(product_id)),
    }
}

/// Append one ledger row. Every stock mutation calls this exactly once in
/// the same transaction as the quantity update.
pub(crate) async fn append_log(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    delta: i64,
    resulting_quantity: i64,
    meta: &StockMeta,
) -> Result<InventoryLogEntry> {
    let id = Uuid::new_v4();
    let row: (chrono::DateTime<chrono::Utc>,) = sqlx::query_as(
        r#"
        INSERT INTO inventory_logs (
            id, product_id, variant_id, delta, resulting_quantity, reason, reference
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING created_at
        "#,
    )
    .bind(id)
    .bind(product_id.0)
    .bind(variant_id.map(|v| v.0))
    .bind(delta)
    .bind(resulting_quantity)
    .bind(meta.reason.as_str())
    .bind(meta.reference.as_deref())
    .fetch_one(&mut **tx)
    .await?;

    Ok(InventoryLogEntry {
        id,
        product_id,
        variant_id,
        delta,
        resulting_quantity,
        reason: meta.reason,
        reference: meta.reference.clone(),
        created_at: row.0,
    })
}
