//! PostgreSQL implementations of the commerce core services.

mod cart_store;
mod inventory;
mod order_store;
mod stock;

pub use cart_store::PgCartStore;
pub use inventory::{InventorySummaryCache, PgInventoryLedger};
pub use order_store::{PgOrderStore, PAYMENT_SYNC_ACTOR};
