//! PostgreSQL cart engine.
//!
//! Carts are created lazily, keyed by exactly one identity (session token
//! or user id), and hold one line per (product, variant) pair. Lines carry
//! no price: prices are always joined live from the catalog at read time,
//! so a catalog price change reaches every open cart on its next read.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    Cart, CartId, CartIdentity, CartItemId, CartLine, CartSnapshot, DroppedQuantity, MergeReport,
    ProductId, UserId, VariantId,
};
use crate::infra::retry::read_with_retry;
use crate::infra::{CartStore, CommerceError, Result};

use super::stock;

type CartRow = (
    Uuid,
    Option<String>,
    Option<Uuid>,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::Utc>,
);

fn cart_from_row(row: CartRow) -> Cart {
    Cart {
        id: CartId::from_uuid(row.0),
        session_token: row.1,
        user_id: row.2.map(UserId::from_uuid),
        created_at: row.3,
        updated_at: row.4,
    }
}

/// PostgreSQL-backed cart store.
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_cart_tx(
        tx: &mut Transaction<'_, Postgres>,
        identity: &CartIdentity,
        lock: bool,
    ) -> Result<Option<Cart>> {
        let suffix = if lock { "FOR UPDATE" } else { "" };
        let query = match identity {
            CartIdentity::Session(_) => format!(
                "SELECT id, session_token, user_id, created_at, updated_at \
                 FROM carts WHERE session_token = $1 {suffix}"
            ),
            CartIdentity::User(_) => format!(
                "SELECT id, session_token, user_id, created_at, updated_at \
                 FROM carts WHERE user_id = $1 {suffix}"
            ),
        };

        let mut q = sqlx::query_as::<_, CartRow>(&query);
        q = match identity {
            CartIdentity::Session(token) => q.bind(token.clone()),
            CartIdentity::User(user_id) => q.bind(user_id.0),
        };

        Ok(q.fetch_optional(&mut **tx).await?.map(cart_from_row))
    }

    /// Insert-or-find under the partial unique indexes, so two concurrent
    /// calls for the same identity converge on one cart row.
    async fn get_or_create_cart_tx(
        tx: &mut Transaction<'_, Postgres>,
        identity: &CartIdentity,
    ) -> Result<Cart> {
        let id = Uuid::new_v4();
        let inserted: Option<CartRow> = match identity {
            CartIdentity::Session(token) => {
                sqlx::query_as(
                    r#"
                    INSERT INTO carts (id, session_token)
                    VALUES ($1, $2)
                    ON CONFLICT (session_token) WHERE session_token IS NOT NULL DO NOTHING
                    RETURNING id, session_token, user_id, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(token)
                .fetch_optional(&mut **tx)
                .await?
            }
            CartIdentity::User(user_id) => {
                sqlx::query_as(
                    r#"
                    INSERT INTO carts (id, user_id)
                    VALUES ($1, $2)
                    ON CONFLICT (user_id) WHERE user_id IS NOT NULL DO NOTHING
                    RETURNING id, session_token, user_id, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(user_id.0)
                .fetch_optional(&mut **tx)
                .await?
            }
        };

        if let Some(row) = inserted {
            return Ok(cart_from_row(row));
        }

        Self::find_cart_tx(tx, identity, false)
            .await?
            .ok_or_else(|| CommerceError::Internal("cart upsert found no row".to_string()))
    }

    async fn cart_exists_tx(tx: &mut Transaction<'_, Postgres>, cart_id: CartId) -> Result<()> {
        let row: Option<(Uuid,)> = sqlx::query_as(r#"SELECT id FROM carts WHERE id = $1"#)
            .bind(cart_id.0)
            .fetch_optional(&mut **tx)
            .await?;
        match row {
            Some(_) => Ok(()),
            None => Err(CommerceError::CartNotFound(cart_id)),
        }
    }

    async fn load_lines_tx(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>> {
        let rows: Vec<(Uuid, Uuid, Option<Uuid>, i64, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT ci.id, ci.product_id, ci.variant_id, ci.quantity,
                   COALESCE(v.name, p.name),
                   COALESCE(v.price_cents, p.price_cents),
                   COALESCE(v.stock_quantity, p.stock_quantity)
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            LEFT JOIN product_variants v ON v.id = ci.variant_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at ASC, ci.id ASC
            "#,
        )
        .bind(cart_id.0)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, product_id, variant_id, quantity, name, price, stock)| CartLine {
                    id: CartItemId::from_uuid(id),
                    product_id: ProductId::from_uuid(product_id),
                    variant_id: variant_id.map(VariantId::from_uuid),
                    name,
                    unit_price_cents: price,
                    quantity,
                    available_stock: stock,
                },
            )
            .collect())
    }

    /// Upsert a line, summing quantities on conflict, returning the row.
    async fn upsert_line_tx(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) -> Result<(CartItemId, i64)> {
        let row: (Uuid, i64) = sqlx::query_as(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_id, product_id, variant_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            RETURNING id, quantity
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id.0)
        .bind(product_id.0)
        .bind(variant_id.map(|v| v.0))
        .bind(quantity)
        .fetch_one(&mut **tx)
        .await?;

        Ok((CartItemId::from_uuid(row.0), row.1))
    }

    async fn touch_cart_tx(tx: &mut Transaction<'_, Postgres>, cart_id: CartId) -> Result<()> {
        sqlx::query(r#"UPDATE carts SET updated_at = NOW() WHERE id = $1"#)
            .bind(cart_id.0)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip(self), fields(identity = %identity))]
    async fn get_or_create_cart(&self, identity: &CartIdentity) -> Result<Cart> {
        if let CartIdentity::Session(token) = identity {
            if token.is_empty() {
                return Err(CommerceError::Validation(
                    "session token must not be empty".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;
        let cart = Self::get_or_create_cart_tx(&mut tx, identity).await?;
        tx.commit().await?;
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn add_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) -> Result<CartLine> {
        if quantity <= 0 {
            return Err(CommerceError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        let mut tx = self.pool.begin().await?;
        Self::cart_exists_tx(&mut tx, cart_id).await?;

        let item = stock::live_item(&mut tx, product_id, variant_id).await?;

        // Advisory stock check over the line total, not just the increment.
        // Policy: the add is blocked, consistently at every call site;
        // checkout re-validates under lock regardless.
        let existing: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT quantity FROM cart_items
            WHERE cart_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(cart_id.0)
        .bind(product_id.0)
        .bind(variant_id.map(|v| v.0))
        .fetch_optional(&mut *tx)
        .await?;

        let requested = existing.map_or(0, |(q,)| q) + quantity;
        if requested > item.stock_quantity {
            return Err(CommerceError::InsufficientStock {
                product_id,
                variant_id,
                requested,
                available: item.stock_quantity,
            });
        }

        let (item_id, line_quantity) =
            Self::upsert_line_tx(&mut tx, cart_id, product_id, variant_id, quantity).await?;
        Self::touch_cart_tx(&mut tx, cart_id).await?;
        tx.commit().await?;

        Ok(CartLine {
            id: item_id,
            product_id,
            variant_id,
            name: item.name,
            unit_price_cents: item.price_cents,
            quantity: line_quantity,
            available_stock: item.stock_quantity,
        })
    }

    #[instrument(skip(self))]
    async fn update_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Scoped to the cart: a line id from another cart is not found.
        let row: Option<(Uuid, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT product_id, variant_id FROM cart_items
            WHERE id = $1 AND cart_id = $2
            FOR UPDATE
            "#,
        )
        .bind(item_id.0)
        .bind(cart_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id, variant_id)) = row else {
            return Err(CommerceError::CartItemNotFound(item_id));
        };
        let product_id = ProductId::from_uuid(product_id);
        let variant_id = variant_id.map(VariantId::from_uuid);

        if quantity <= 0 {
            // Zero or less is removal, per contract.
            sqlx::query(r#"DELETE FROM cart_items WHERE id = $1"#)
                .bind(item_id.0)
                .execute(&mut *tx)
                .await?;
        } else {
            let item = stock::live_item(&mut tx, product_id, variant_id).await?;
            if quantity > item.stock_quantity {
                return Err(CommerceError::InsufficientStock {
                    product_id,
                    variant_id,
                    requested: quantity,
                    available: item.stock_quantity,
                });
            }
            sqlx::query(r#"UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1"#)
                .bind(item_id.0)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        }

        Self::touch_cart_tx(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_from_cart(&self, cart_id: CartId, item_id: CartItemId) -> Result<()> {
        // Idempotent: deleting an absent line is a no-op.
        sqlx::query(r#"DELETE FROM cart_items WHERE id = $1 AND cart_id = $2"#)
            .bind(item_id.0)
            .bind(cart_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::cart_exists_tx(&mut tx, cart_id).await?;
        sqlx::query(r#"DELETE FROM cart_items WHERE cart_id = $1"#)
            .bind(cart_id.0)
            .execute(&mut *tx)
            .await?;
        Self::touch_cart_tx(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_cart(&self, cart_id: CartId) -> Result<CartSnapshot> {
        read_with_retry("load_cart", || async {
            let mut tx = self.pool.begin().await?;
            let row: Option<CartRow> = sqlx::query_as(
                r#"SELECT id, session_token, user_id, created_at, updated_at
                   FROM carts WHERE id = $1"#,
            )
            .bind(cart_id.0)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                return Err(CommerceError::CartNotFound(cart_id));
            };
            let lines = Self::load_lines_tx(&mut tx, cart_id).await?;
            tx.commit().await?;

            Ok(CartSnapshot {
                cart: cart_from_row(row),
                lines,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn merge_guest_cart(&self, session_token: &str, user_id: UserId) -> Result<MergeReport> {
        let mut tx = self.pool.begin().await?;

        // Lock the guest cart first; a retried merge finds it gone and
        // returns an empty report instead of double-adding quantities.
        let guest =
            Self::find_cart_tx(&mut tx, &CartIdentity::Session(session_token.to_string()), true)
                .await?;
        let Some(guest) = guest else {
            tx.commit().await?;
            return Ok(MergeReport::default());
        };

        let user_cart = Self::get_or_create_cart_tx(&mut tx, &CartIdentity::User(user_id)).await?;
        let guest_lines = Self::load_lines_tx(&mut tx, guest.id).await?;
        let user_lines = Self::load_lines_tx(&mut tx, user_cart.id).await?;

        let mut report = MergeReport::default();
        for line in &guest_lines {
            let existing = user_lines.iter().find(|ul| {
                ul.product_id == line.product_id && ul.variant_id == line.variant_id
            });

            let current = existing.map_or(0, |ul| ul.quantity);
            let requested = current + line.quantity;
            // Cap the summed quantity at on-hand stock; excess is dropped
            // and reported, never silently.
            let stock = match stock::live_item(&mut tx, line.product_id, line.variant_id).await {
                Ok(item) => item.stock_quantity,
                // A product pulled from the catalog mid-session merges as
                // zero stock: the line is dropped and reported.
                Err(err) if err.is_not_found() => 0,
                Err(err) => return Err(err),
            };
            let kept = requested.min(stock);

            if kept > current {
                Self::upsert_line_tx(
                    &mut tx,
                    user_cart.id,
                    line.product_id,
                    line.variant_id,
                    kept - current,
                )
                .await?;
                if existing.is_some() {
                    report.lines_merged += 1;
                } else {
                    report.lines_moved += 1;
                }
            }
            if kept < requested {
                report.dropped.push(DroppedQuantity {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    requested,
                    kept,
                });
            }
        }

        // Cascade removes the guest lines with the cart row.
        sqlx::query(r#"DELETE FROM carts WHERE id = $1"#)
            .bind(guest.id.0)
            .execute(&mut *tx)
            .await?;
        Self::touch_cart_tx(&mut tx, user_cart.id).await?;
        tx.commit().await?;

        Ok(report)
    }
}
