//! Trait definitions for the commerce core services.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Cart, CartId, CartIdentity, CartItemId, CartLine, CartSnapshot, InventoryLogEntry,
    InventorySummary, MergeReport, Order, OrderId, OrderItem, OrderStatus,
    OrderStatusHistoryEntry, OrderTransition, PaymentStatus, ProductId, StockLevel, StockMeta,
    UserId, VariantId,
};

use super::Result;

/// Cart engine: line-item mutation and the guest/user merge.
///
/// Invariant: at most one open cart per identity, one line per
/// (product, variant) pair within a cart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the open cart for an identity, creating it lazily.
    async fn get_or_create_cart(&self, identity: &CartIdentity) -> Result<Cart>;

    /// Add a quantity of a product (or variant) to a cart.
    ///
    /// - Rejects non-positive quantities with `Validation`.
    /// - Rejects missing/inactive products or variants with the not-found family.
    /// - Rejects quantities exceeding on-hand stock with `InsufficientStock`
    ///   (advisory check: no reservation is taken; checkout re-validates).
    /// - An existing (product, variant) line is incremented, never duplicated.
    async fn add_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) -> Result<CartLine>;

    /// Set a line's quantity. Zero or negative removes the line. The item
    /// must belong to the given cart; a line in another cart is not found.
    async fn update_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<()>;

    /// Remove a line. Idempotent: removing an absent line is a no-op.
    async fn remove_from_cart(&self, cart_id: CartId, item_id: CartItemId) -> Result<()>;

    /// Delete all lines; the cart row persists.
    async fn clear_cart(&self, cart_id: CartId) -> Result<()>;

    /// Load a cart with its lines joined against live catalog prices.
    async fn load_cart(&self, cart_id: CartId) -> Result<CartSnapshot>;

    /// Merge a guest session cart into a user cart on login.
    ///
    /// Runs in one transaction and deletes the guest cart inside it, so a
    /// retried merge finds no guest cart and is a no-op. Conflicting lines
    /// are summed and capped at on-hand stock; dropped excess is reported.
    async fn merge_guest_cart(&self, session_token: &str, user_id: UserId) -> Result<MergeReport>;
}

/// Inventory ledger: the only writer of stock quantities.
///
/// Every mutation appends exactly one ledger row and updates the
/// denormalized on-hand quantity in the same transaction.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Record a positive delta. Always allowed.
    async fn add_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry>;

    /// Record a negative delta. Fails with `InsufficientStock` when the
    /// resulting quantity would go below zero; check and write are atomic
    /// with respect to concurrent removals on the same row.
    async fn remove_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry>;

    /// Move on-hand stock to an absolute target, recorded as one delta.
    async fn set_stock(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        target: i64,
        meta: StockMeta,
    ) -> Result<InventoryLogEntry>;

    /// Recent ledger rows, newest first, optionally filtered by product.
    async fn get_inventory_logs(
        &self,
        product_id: Option<ProductId>,
        limit: i64,
    ) -> Result<Vec<InventoryLogEntry>>;

    /// Aggregate stock counts across the catalog.
    async fn get_inventory_summary(&self) -> Result<InventorySummary>;

    /// Products/variants at or below the configured low-stock threshold.
    async fn get_low_stock_products(&self) -> Result<Vec<StockLevel>>;

    /// Products/variants with exactly zero on-hand stock.
    async fn get_out_of_stock_products(&self) -> Result<Vec<StockLevel>>;
}

/// Checkout and the order status state machine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Convert a cart into an order, all-or-nothing.
    ///
    /// In one transaction: re-validates stock per line, decrements
    /// inventory (one ledger row per line), snapshots lines and pricing
    /// into a `pending` order, appends the initial history row and clears
    /// the cart. Any stock failure aborts the whole operation.
    async fn checkout(&self, cart_id: CartId, actor: &str) -> Result<Order>;

    /// Operator-driven status transition.
    ///
    /// Rejects illegal edges and anything out of a terminal state with
    /// `InvalidTransition`. `confirmed` is reserved for payment
    /// reconciliation and is rejected here. `cancelled` goes through
    /// [`OrderStore::cancel_order`] so restock always happens.
    async fn transition_order(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        actor: &str,
        comment: Option<String>,
    ) -> Result<Order>;

    /// Cancel a non-terminal order and restock its lines, atomically.
    async fn cancel_order(
        &self,
        order_id: OrderId,
        actor: &str,
        comment: Option<String>,
    ) -> Result<Order>;

    /// Apply an authoritative payment status from reconciliation.
    ///
    /// Writes only on change; a newly `paid` status advances a `pending`
    /// order to `confirmed` with one history row. Idempotent under retry.
    async fn apply_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
        payment_ref: Option<String>,
    ) -> Result<PaymentSyncOutcome>;

    async fn get_order(&self, order_id: OrderId) -> Result<Order>;

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Audit trail, oldest first.
    async fn get_order_history(&self, order_id: OrderId) -> Result<Vec<OrderStatusHistoryEntry>>;
}

/// Result of applying a provider payment status to an order.
#[derive(Debug, Clone)]
pub struct PaymentSyncOutcome {
    pub order: Order,
    /// Whether the local payment status actually changed.
    pub payment_status_changed: bool,
    /// Whether the order advanced to `confirmed` as part of this sync.
    pub order_confirmed: bool,
}

/// Notification collaborator: receives committed status transitions.
///
/// Delivery (email, webhooks) is outside the core; the default sink only
/// traces.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderEventSink: Send + Sync {
    async fn order_transitioned(&self, transition: &OrderTransition);
}

/// Default sink that logs transitions.
#[derive(Debug, Default)]
pub struct LogEventSink;

#[async_trait]
impl OrderEventSink for LogEventSink {
    async fn order_transitioned(&self, transition: &OrderTransition) {
        tracing::info!(
            order_id = %transition.order_id,
            from = %transition.from,
            to = %transition.to,
            actor = %transition.actor,
            "order status transition"
        );
    }
}
