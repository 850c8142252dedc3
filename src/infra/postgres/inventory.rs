//! PostgreSQL inventory ledger.
//!
//! The only writer of stock quantities. Every mutation runs in one
//! transaction that updates the denormalized on-hand quantity and appends
//! exactly one `inventory_logs` row; the running sum of deltas therefore
//! always equals the current quantity, and the quantity never goes
//! negative.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    InventoryLogEntry, InventorySummary, ProductId, StockChangeReason, StockLevel, StockMeta,
    VariantId,
};
use crate::infra::cache::LruCache;
use crate::infra::retry::read_with_retry;
use crate::infra::{CommerceError, InventoryLedger, Result};

use super::stock;

/// Cache for the aggregate inventory summary, invalidated on every stock
/// mutation. Owned by the caller and passed in (see server bootstrap).
pub type InventorySummaryCache = LruCache<&'static str, InventorySummary>;

const SUMMARY_CACHE_KEY: &str = "inventory_summary";

/// PostgreSQL-backed inventory ledger.
pub struct PgInventoryLedger {
    pool: PgPool,
    /// Quantities at or below this (and above zero) count as low stock.
    low_stock_threshold: i64,
    summary_cache: Arc<InventorySummaryCache>,
}

impl PgInventoryLedger {
    pub fn new(
        pool: PgPool,
        low_stock_threshold: i64,
        summary_cache: Arc<InventorySummaryCache>,
    ) -> Self {
        Self {
            pool,
            low_stock_threshold,
            summary_cache,
        }
    }

    fn validate_quantity(quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(CommerceError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        Ok(())
    }

    async fn stock_levels_where(
        &self,
        predicate: &str,
        bind_threshold: bool,
    ) -> Result<Vec<StockLevel>> {
        // Variants carry their own stock; products without variants are
        // tracked on the product row itself.
        let query = format!(
            r#"
            SELECT p.id, NULL::uuid, p.name, p.stock_quantity
            FROM products p
            WHERE p.active AND {predicate}
            UNION ALL
            SELECT v.product_id, v.id, v.name, v.stock_quantity
            FROM product_variants v
            JOIN products pp ON pp.id = v.product_id
            WHERE v.active AND pp.active AND {predicate2}
            ORDER BY 4 ASC, 3 ASC
            "#,
            predicate = predicate.replace("{q}", "p.stock_quantity"),
            predicate2 = predicate.replace("{q}", "v.stock_quantity"),
        );

        let mut q = sqlx::query_as(&query);
        if bind_threshold {
            q = q.bind(self.low_stock_threshold);
        }
        let rows: Vec<(Uuid, Option<Uuid>, String, i64)> = q.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, variant_id, name, quantity)| StockLevel {
                product_id: ProductId::from_uuid(product_id),
                variant_id: variant_id.map(VariantId::from_uuid),
                name,
                quantity,
            })
            .collect())
    }
}

#[async_trait]
impl InventoryLedger for PgInventoryLedger {
    #[instrument(skip(self, meta), fields(reason = %meta.reason))]
    async fn add_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry> {
        Self::validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;
        let resulting = stock::apply_delta(&mut tx, product_id, variant_id, quantity).await?;
        let entry =
            stock::append_log(&mut tx, product_id, variant_id, quantity, resulting, &meta).await?;
        tx.commit().await?;

        self.summary_cache.invalidate_all().await;
        Ok(entry)
    }

    #[instrument(skip(self, meta), fields(reason = %meta.reason))]
    async fn remove_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry> {
        Self::validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;
        let resulting =
            stock::conditional_decrement(&mut tx, product_id, variant_id, quantity).await?;
        let entry =
            stock::append_log(&mut tx, product_id, variant_id, -quantity, resulting, &meta).await?;
        tx.commit().await?;

        self.summary_cache.invalidate_all().await;
        Ok(entry)
    }

    #[instrument(skip(self, meta), fields(reason = %meta.reason))]
    async fn set_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        target: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry> {
        if target < 0 {
            return Err(CommerceError::Validation(format!(
                "target stock must not be negative, got {target}"
            )));
        }

        let mut tx = self.pool.begin().await?;
        // Lock the row so the delta is computed against a stable quantity.
        let current = stock::lock_stock(&mut tx, product_id, variant_id).await?;
        let delta = target - current;
        if delta != 0 {
            stock::apply_delta(&mut tx, product_id, variant_id, delta).await?;
        }
        let entry = stock::append_log(&mut tx, product_id, variant_id, delta, target, &meta).await?;
        tx.commit().await?;

        self.summary_cache.invalidate_all().await;
        Ok(entry)
    }

    async fn get_inventory_logs(
        &self,
        product_id: Option<ProductId>,
        limit: i64,
    ) -> Result<Vec<InventoryLogEntry>> {
        let limit = limit.clamp(1, 1000);
        read_with_retry("get_inventory_logs", || async {
            let rows: Vec<(
                Uuid,
                Uuid,
                Option<Uuid>,
                i64,
                i64,
                String,
                Option<String>,
                chrono::DateTime<chrono::Utc>,
            )> = sqlx::query_as(
                r#"
                SELECT id, product_id, variant_id, delta, resulting_quantity,
                       reason, reference, created_at
                FROM inventory_logs
                WHERE $1::uuid IS NULL OR product_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
                "#,
            )
            .bind(product_id.map(|p| p.0))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(
                    |(id, product_id, variant_id, delta, resulting, reason, reference, created_at)| {
                        let reason = StockChangeReason::parse(&reason).ok_or_else(|| {
                            CommerceError::Internal(format!("unknown stock reason: {reason}"))
                        })?;
                        Ok(InventoryLogEntry {
                            id,
                            product_id: ProductId::from_uuid(product_id),
                            variant_id: variant_id.map(VariantId::from_uuid),
                            delta,
                            resulting_quantity: resulting,
                            reason,
                            reference,
                            created_at,
                        })
                    },
                )
                .collect()
        })
        .await
    }

    async fn get_inventory_summary(&self) -> Result<InventorySummary> {
        if let Some(cached) = self.summary_cache.get(&SUMMARY_CACHE_KEY).await {
            return Ok(cached);
        }

        let summary = read_with_retry("get_inventory_summary", || async {
            let row: (i64, i64, i64, i64) = sqlx::query_as(
                r#"
                WITH levels AS (
                    SELECT stock_quantity FROM products WHERE active
                    UNION ALL
                    SELECT v.stock_quantity
                    FROM product_variants v
                    JOIN products p ON p.id = v.product_id
                    WHERE v.active AND p.active
                )
                SELECT
                    (SELECT COUNT(*) FROM products WHERE active),
                    COALESCE(SUM(stock_quantity), 0)::BIGINT,
                    COUNT(*) FILTER (WHERE stock_quantity > 0 AND stock_quantity <= $1),
                    COUNT(*) FILTER (WHERE stock_quantity = 0)
                FROM levels
                "#,
            )
            .bind(self.low_stock_threshold)
            .fetch_one(&self.pool)
            .await?;

            Ok(InventorySummary {
                product_count: row.0,
                total_units: row.1,
                low_stock_count: row.2,
                out_of_stock_count: row.3,
            })
        })
        .await?;

        self.summary_cache.insert(SUMMARY_CACHE_KEY, summary).await;
        Ok(summary)
    }

    async fn get_low_stock_products(&self) -> Result<Vec<StockLevel>> {
        read_with_retry("get_low_stock_products", || async {
            self.stock_levels_where("{q} > 0 AND {q} <= $1", true).await
        })
        .await
    }

    async fn get_out_of_stock_products(&self) -> Result<Vec<StockLevel>> {
        read_with_retry("get_out_of_stock_products", || async {
            self.stock_levels_where("{q} = 0", false).await
        })
        .await
    }
}
