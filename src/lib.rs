//! Commerce Core Library
//!
//! Cart and order state lifecycle for the storefront backend: cart
//! mutation, checkout, the order status state machine, inventory
//! reconciliation, and payment synchronization.
//!
//! ## Modules
//!
//! - [`domain`] - Pure domain types (carts, orders, ledger vocabulary)
//! - [`infra`] - PostgreSQL stores, cache, retry and error types
//! - [`crypto`] - Payment callback signature verification
//! - [`payment`] - Payment provider reconciliation
//! - [`api`] - REST API routes
//! - [`server`] - Configuration and HTTP bootstrap

pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod migrations;
pub mod payment;
pub mod server;

// Re-export commonly used types
pub use domain::{
    calculate_cart_summary, Cart, CartId, CartIdentity, CartItemId, CartLine, CartSnapshot,
    CartSummary, InventoryLogEntry, InventorySummary, MergeReport, Order, OrderId, OrderStatus,
    OrderTransition, PaymentStatus, ProductId, StockChangeReason, StockMeta, UserId, VariantId,
};

pub use infra::{
    CartStore, CommerceError, InventoryLedger, OrderStore, PgCartStore, PgInventoryLedger,
    PgOrderStore, Result,
};
