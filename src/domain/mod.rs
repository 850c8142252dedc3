//! Domain models for the commerce core.
//!
//! Pure types and logic only: identifiers, carts and their derived
//! summaries, the order status state machine, the inventory ledger
//! vocabulary, and payment state mapping. All I/O lives in [`crate::infra`].

mod cart;
mod inventory;
mod order;
mod payment;
mod types;

pub use cart::*;
pub use inventory::*;
pub use order::*;
pub use payment::*;
pub use types::*;
