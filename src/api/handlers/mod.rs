//! REST API handlers.

pub mod carts;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod payments;
