//! Cart domain types and the pure summary computation.
//!
//! A cart is a mutable pre-order collection of line items tied to a session
//! or user identity. Prices are *live*: a line carries the unit price read
//! from the catalog at load time, so a catalog price change is visible on
//! the next read of an open cart. Prices are only frozen into a snapshot at
//! checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{CartId, CartItemId, ProductId, UserId, VariantId};

/// A cart row. Lines are carried separately in [`CartSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub session_token: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart, joined with the live catalog price and stock.
///
/// `unit_price_cents` and `available_stock` come from the variant when the
/// line references one, otherwise from the product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub available_stock: i64,
}

/// A cart together with its lines, as read in one consistent query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Derived totals for a cart snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Number of distinct lines.
    pub item_count: usize,
    /// Sum of line quantities.
    pub total_quantity: i64,
    /// Sum of unit price times quantity, in minor units.
    pub subtotal_cents: i64,
}

/// Compute the summary for a cart snapshot.
///
/// Pure and deterministic: no I/O, no clock, same snapshot in means same
/// summary out. Price changes reach the summary only through a fresh
/// snapshot.
pub fn calculate_cart_summary(snapshot: &CartSnapshot) -> CartSummary {
    let mut total_quantity = 0i64;
    let mut subtotal_cents = 0i64;
    for line in &snapshot.lines {
        total_quantity += line.quantity;
        subtotal_cents += line.unit_price_cents * line.quantity;
    }
    CartSummary {
        item_count: snapshot.lines.len(),
        total_quantity,
        subtotal_cents,
    }
}

/// Outcome of a guest-to-user cart merge.
///
/// Merge policy: matching (product, variant) lines are summed and capped at
/// on-hand stock; anything over the cap is dropped and reported here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    /// Lines moved from the guest cart into the user cart.
    pub lines_moved: usize,
    /// Lines whose quantities were summed into an existing user line.
    pub lines_merged: usize,
    /// Quantity dropped because the summed quantity exceeded on-hand stock.
    pub dropped: Vec<DroppedQuantity>,
}

/// A quantity dropped during merge because stock could not cover it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedQuantity {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub requested: i64,
    pub kept: i64,
}
