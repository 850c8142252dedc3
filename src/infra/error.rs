//! Error types for the commerce core.

use thiserror::Error;

use crate::domain::{CartId, CartItemId, OrderId, OrderStatus, ProductId, VariantId};

/// Errors surfaced by cart, inventory, order and payment operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Product not found or inactive
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Variant not found or inactive
    #[error("variant not found: {0}")]
    VariantNotFound(VariantId),

    /// Cart not found
    #[error("cart not found: {0}")]
    CartNotFound(CartId),

    /// Cart item not found
    #[error("cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// Order not found
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Requested quantity exceeds on-hand stock
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        variant_id: Option<VariantId>,
        requested: i64,
        available: i64,
    },

    /// Illegal order-status transition
    #[error("invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Malformed input
    #[error("validation error: {0}")]
    Validation(String),

    /// Payment signature or callback verification failure; always fails closed
    #[error("payment verification failed: {0}")]
    PaymentVerification(String),

    /// External payment provider error
    #[error("payment provider error: {0}")]
    PaymentProvider(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommerceError {
    /// Whether this is a not-found family error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CommerceError::ProductNotFound(_)
                | CommerceError::VariantNotFound(_)
                | CommerceError::CartNotFound(_)
                | CommerceError::CartItemNotFound(_)
                | CommerceError::OrderNotFound(_)
        )
    }
}

/// Result type for commerce operations.
pub type Result<T> = std::result::Result<T, CommerceError>;
