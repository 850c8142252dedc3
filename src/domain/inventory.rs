//! Inventory ledger domain types.
//!
//! Stock changes are recorded as signed deltas in an append-only log; the
//! denormalized on-hand quantity on the product/variant row is updated in
//! the same transaction and must never go negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::types::{ProductId, VariantId};

/// Why a stock delta was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeReason {
    /// Goods received or manually added.
    Restock,
    /// Decrement performed by checkout.
    Checkout,
    /// Compensating restock after an order cancellation.
    OrderCancelled,
    /// Operator adjustment to an absolute target.
    Correction,
    /// Free-form manual adjustment.
    Manual,
}

impl StockChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockChangeReason::Restock => "restock",
            StockChangeReason::Checkout => "checkout",
            StockChangeReason::OrderCancelled => "order_cancelled",
            StockChangeReason::Correction => "correction",
            StockChangeReason::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "restock" => Some(StockChangeReason::Restock),
            "checkout" => Some(StockChangeReason::Checkout),
            "order_cancelled" => Some(StockChangeReason::OrderCancelled),
            "correction" => Some(StockChangeReason::Correction),
            "manual" => Some(StockChangeReason::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for StockChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to a stock mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMeta {
    pub reason: StockChangeReason,
    /// Opaque reference to the triggering entity (order id, PO number, ...).
    pub reference: Option<String>,
}

impl StockMeta {
    pub fn new(reason: StockChangeReason) -> Self {
        Self {
            reason,
            reference: None,
        }
    }

    pub fn with_reference(reason: StockChangeReason, reference: impl Into<String>) -> Self {
        Self {
            reason,
            reference: Some(reference.into()),
        }
    }
}

/// One immutable row of the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLogEntry {
    pub id: Uuid,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub delta: i64,
    pub resulting_quantity: i64,
    pub reason: StockChangeReason,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// On-hand stock for one product or variant, as reported by projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub quantity: i64,
}

/// Aggregate view over the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub product_count: i64,
    pub total_units: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}
