//! PostgreSQL order store: checkout, the status state machine, and payment
//! status application.
//!
//! Checkout is all-or-nothing: stock validation, per-line inventory
//! decrement, the order snapshot, the initial history row and the cart
//! clear all commit together or not at all. Status transitions update the
//! order row and append exactly one history row in the same transaction.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::{
    CartId, Order, OrderId, OrderItem, OrderStatus, OrderStatusHistoryEntry, OrderTransition,
    PaymentStatus, ProductId, StockChangeReason, StockMeta, UserId, VariantId,
};
use crate::infra::retry::read_with_retry;
use crate::infra::{CommerceError, OrderEventSink, OrderStore, PaymentSyncOutcome, Result};

use super::stock;

/// Actor recorded on history rows written by payment reconciliation.
pub const PAYMENT_SYNC_ACTOR: &str = "payment_sync";

type OrderRow = (
    Uuid,
    Option<String>,
    Option<Uuid>,
    String,
    String,
    Option<String>,
    i64,
    i64,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::Utc>,
);

fn order_from_row(row: OrderRow) -> Result<Order> {
    let status = OrderStatus::parse(&row.3)
        .ok_or_else(|| CommerceError::Internal(format!("unknown order status: {}", row.3)))?;
    let payment_status = PaymentStatus::parse(&row.4)
        .ok_or_else(|| CommerceError::Internal(format!("unknown payment status: {}", row.4)))?;
    Ok(Order {
        id: OrderId::from_uuid(row.0),
        session_token: row.1,
        user_id: row.2.map(UserId::from_uuid),
        status,
        payment_status,
        payment_ref: row.5,
        subtotal_cents: row.6,
        total_quantity: row.7,
        created_at: row.8,
        updated_at: row.9,
    })
}

/// PostgreSQL-backed order store.
pub struct PgOrderStore {
    pool: PgPool,
    sink: Arc<dyn OrderEventSink>,
}

impl PgOrderStore {
    pub fn new(pool: PgPool, sink: Arc<dyn OrderEventSink>) -> Self {
        Self { pool, sink }
    }

    async fn lock_order_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
    ) -> Result<Order> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, session_token, user_id, status, payment_status, payment_ref,
                   subtotal_cents, total_quantity, created_at, updated_at
            FROM orders WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id.0)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => order_from_row(row),
            None => Err(CommerceError::OrderNotFound(order_id)),
        }
    }

    async fn set_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        status: OrderStatus,
        actor: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        sqlx::query(r#"UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1"#)
            .bind(order_id.0)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Self::append_history_tx(tx, order_id, status, actor, comment).await
    }

    async fn append_history_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        status: OrderStatus,
        actor: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, comment, actor)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id.0)
        .bind(status.as_str())
        .bind(comment)
        .bind(actor)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn order_items_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let rows: Vec<(Uuid, Option<Uuid>, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT product_id, variant_id, name, unit_price_cents, quantity
            FROM order_items WHERE order_id = $1
            ORDER BY product_id, variant_id
            "#,
        )
        .bind(order_id.0)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, variant_id, name, unit_price_cents, quantity)| OrderItem {
                order_id,
                product_id: ProductId::from_uuid(product_id),
                variant_id: variant_id.map(VariantId::from_uuid),
                name,
                unit_price_cents,
                quantity,
            })
            .collect())
    }

    async fn emit(&self, order_id: OrderId, from: OrderStatus, to: OrderStatus, actor: &str) {
        self.sink
            .order_transitioned(&OrderTransition {
                order_id,
                from,
                to,
                actor: actor.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self))]
    async fn checkout(&self, cart_id: CartId, actor: &str) -> Result<Order> {
        let order_id = OrderId::new();
        let mut tx = self.pool.begin().await?;

        let cart: Option<(Option<String>, Option<Uuid>)> =
            sqlx::query_as(r#"SELECT session_token, user_id FROM carts WHERE id = $1 FOR UPDATE"#)
                .bind(cart_id.0)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((session_token, user_id)) = cart else {
            return Err(CommerceError::CartNotFound(cart_id));
        };

        // Deterministic lock order across concurrent checkouts touching the
        // same products.
        let lines: Vec<(Uuid, Option<Uuid>, i64)> = sqlx::query_as(
            r#"
            SELECT product_id, variant_id, quantity
            FROM cart_items WHERE cart_id = $1
            ORDER BY product_id, variant_id
            "#,
        )
        .bind(cart_id.0)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CommerceError::Validation("cart is empty".to_string()));
        }

        let meta = StockMeta::with_reference(StockChangeReason::Checkout, order_id.to_string());
        let mut subtotal_cents = 0i64;
        let mut total_quantity = 0i64;
        let mut snapshots = Vec::with_capacity(lines.len());

        for (product_id, variant_id, quantity) in lines {
            let product_id = ProductId::from_uuid(product_id);
            let variant_id = variant_id.map(VariantId::from_uuid);

            // Snapshot name and price, then decrement; any failure rolls
            // back every prior decrement with the transaction.
            let item = stock::live_item(&mut tx, product_id, variant_id).await?;
            let resulting =
                stock::conditional_decrement(&mut tx, product_id, variant_id, quantity).await?;
            stock::append_log(&mut tx, product_id, variant_id, -quantity, resulting, &meta)
                .await?;

            subtotal_cents += item.price_cents * quantity;
            total_quantity += quantity;
            snapshots.push((product_id, variant_id, item.name, item.price_cents, quantity));
        }

        let row: (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            r#"
            INSERT INTO orders (
                id, session_token, user_id, status, payment_status,
                subtotal_cents, total_quantity
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at, updated_at
            "#,
        )
        .bind(order_id.0)
        .bind(session_token.as_deref())
        .bind(user_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(subtotal_cents)
        .bind(total_quantity)
        .fetch_one(&mut *tx)
        .await?;

        for (product_id, variant_id, name, unit_price_cents, quantity) in &snapshots {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, variant_id, name, unit_price_cents, quantity
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id.0)
            .bind(product_id.0)
            .bind(variant_id.map(|v| v.0))
            .bind(name)
            .bind(unit_price_cents)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        Self::append_history_tx(&mut tx, order_id, OrderStatus::Pending, actor, None).await?;

        // Clear the source cart; the cart row itself persists.
        sqlx::query(r#"DELETE FROM cart_items WHERE cart_id = $1"#)
            .bind(cart_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            session_token,
            user_id: user_id.map(UserId::from_uuid),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
            subtotal_cents,
            total_quantity,
            created_at: row.0,
            updated_at: row.1,
        })
    }

    #[instrument(skip(self, comment))]
    async fn transition_order(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor: &str,
        comment: Option<String>,
    ) -> Result<Order> {
        if new_status == OrderStatus::Confirmed {
            return Err(CommerceError::Validation(
                "confirmed is driven by payment reconciliation, not operators".to_string(),
            ));
        }
        if new_status == OrderStatus::Cancelled {
            return self.cancel_order(order_id, actor, comment).await;
        }

        let mut tx = self.pool.begin().await?;
        let mut order = Self::lock_order_tx(&mut tx, order_id).await?;
        let from = order.status;

        if !from.can_transition_to(new_status) {
            return Err(CommerceError::InvalidTransition {
                order_id,
                from,
                to: new_status,
            });
        }

        Self::set_status_tx(&mut tx, order_id, new_status, actor, comment.as_deref()).await?;
        tx.commit().await?;

        self.emit(order_id, from, new_status, actor).await;
        order.status = new_status;
        Ok(order)
    }

    #[instrument(skip(self, comment))]
    async fn cancel_order(
        &self,
        order_id: OrderId,
        actor: &str,
        comment: Option<String>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let mut order = Self::lock_order_tx(&mut tx, order_id).await?;
        let from = order.status;

        if !from.can_transition_to(OrderStatus::Cancelled) {
            return Err(CommerceError::InvalidTransition {
                order_id,
                from,
                to: OrderStatus::Cancelled,
            });
        }

        Self::set_status_tx(
            &mut tx,
            order_id,
            OrderStatus::Cancelled,
            actor,
            comment.as_deref(),
        )
        .await?;

        // Compensating restock: one ledger row per line. A product removed
        // from the catalog since checkout has nothing to restock onto; the
        // ledger keeps the checkout decrement as history.
        let meta =
            StockMeta::with_reference(StockChangeReason::OrderCancelled, order_id.to_string());
        let items = Self::order_items_tx(&mut tx, order_id).await?;
        for item in &items {
            match stock::apply_delta(&mut tx, item.product_id, item.variant_id, item.quantity)
                .await
            {
                Ok(resulting) => {
                    stock::append_log(
                        &mut tx,
                        item.product_id,
                        item.variant_id,
                        item.quantity,
                        resulting,
                        &meta,
                    )
                    .await?;
                }
                Err(err) if err.is_not_found() => {
                    warn!(order_id = %order_id, product_id = %item.product_id,
                        "skipping restock for product no longer in catalog");
                }
                Err(err) => return Err(err),
            }
        }

        tx.commit().await?;

        self.emit(order_id, from, OrderStatus::Cancelled, actor).await;
        order.status = OrderStatus::Cancelled;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn apply_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
        payment_ref: Option<String>,
    ) -> Result<PaymentSyncOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut order = Self::lock_order_tx(&mut tx, order_id).await?;

        // Idempotence: status write and history only on an actual change.
        // A new provider reference is still recorded, without history.
        if order.payment_status == payment_status {
            let new_ref =
                payment_ref.filter(|r| order.payment_ref.as_deref() != Some(r.as_str()));
            if let Some(reference) = new_ref {
                sqlx::query(
                    r#"UPDATE orders SET payment_ref = $2, updated_at = NOW() WHERE id = $1"#,
                )
                .bind(order_id.0)
                .bind(&reference)
                .execute(&mut *tx)
                .await?;
                order.payment_ref = Some(reference);
            }
            tx.commit().await?;
            return Ok(PaymentSyncOutcome {
                order,
                payment_status_changed: false,
                order_confirmed: false,
            });
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2,
                payment_ref = COALESCE($3, payment_ref),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id.0)
        .bind(payment_status.as_str())
        .bind(payment_ref.as_deref())
        .execute(&mut *tx)
        .await?;

        // A newly paid order advances pending -> confirmed; this is the
        // only path into confirmed.
        let from = order.status;
        let confirm = payment_status == PaymentStatus::Paid && from == OrderStatus::Pending;
        if confirm {
            Self::set_status_tx(
                &mut tx,
                order_id,
                OrderStatus::Confirmed,
                PAYMENT_SYNC_ACTOR,
                Some("payment captured"),
            )
            .await?;
        }
        tx.commit().await?;

        if confirm {
            self.emit(order_id, from, OrderStatus::Confirmed, PAYMENT_SYNC_ACTOR)
                .await;
            order.status = OrderStatus::Confirmed;
        }
        order.payment_status = payment_status;
        if let Some(reference) = payment_ref {
            order.payment_ref = Some(reference);
        }

        Ok(PaymentSyncOutcome {
            order,
            payment_status_changed: true,
            order_confirmed: confirm,
        })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        read_with_retry("get_order", || async {
            let row: Option<OrderRow> = sqlx::query_as(
                r#"
                SELECT id, session_token, user_id, status, payment_status, payment_ref,
                       subtotal_cents, total_quantity, created_at, updated_at
                FROM orders WHERE id = $1
                "#,
            )
            .bind(order_id.0)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => order_from_row(row),
                None => Err(CommerceError::OrderNotFound(order_id)),
            }
        })
        .await
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        read_with_retry("get_order_items", || async {
            let mut tx = self.pool.begin().await?;
            let items = Self::order_items_tx(&mut tx, order_id).await?;
            tx.commit().await?;
            Ok(items)
        })
        .await
    }

    async fn get_order_history(&self, order_id: OrderId) -> Result<Vec<OrderStatusHistoryEntry>> {
        read_with_retry("get_order_history", || async {
            let rows: Vec<(String, Option<String>, String, chrono::DateTime<chrono::Utc>)> =
                sqlx::query_as(
                    r#"
                    SELECT status, comment, actor, created_at
                    FROM order_status_history
                    WHERE order_id = $1
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(order_id.0)
                .fetch_all(&self.pool)
                .await?;

            rows.into_iter()
                .map(|(status, comment, actor, created_at)| {
                    let status = OrderStatus::parse(&status).ok_or_else(|| {
                        CommerceError::Internal(format!("unknown order status: {status}"))
                    })?;
                    Ok(OrderStatusHistoryEntry {
                        order_id,
                        status,
                        comment,
                        actor,
                        created_at,
                    })
                })
                .collect()
        })
        .await
    }
}
