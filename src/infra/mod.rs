//! Infrastructure implementations for the commerce core.

pub mod cache;
mod error;
pub mod postgres;
pub mod retry;
mod traits;

pub use error::{CommerceError, Result};
pub use postgres::{InventorySummaryCache, PgCartStore, PgInventoryLedger, PgOrderStore};
pub use traits::{
    CartStore, InventoryLedger, LogEventSink, OrderEventSink, OrderStore, PaymentSyncOutcome,
};

#[cfg(test)]
pub use traits::{MockCartStore, MockInventoryLedger, MockOrderEventSink, MockOrderStore};
