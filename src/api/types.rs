//! Request and response types for the REST API.
//!
//! Requests are explicit typed structs validated field by field; validation
//! failures name the offending field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::{CartSummary, MergeReport, Order, OrderStatus};

/// POST /api/v1/cart/items
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

impl AddItemRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.quantity <= 0 {
            return Err(ApiError::validation("quantity: must be a positive integer"));
        }
        Ok(())
    }
}

/// PATCH /api/v1/cart/items/:id
///
/// A quantity of zero or less removes the line.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// POST /api/v1/orders/:id/status
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl TransitionRequest {
    pub fn parse_status(&self) -> Result<OrderStatus, ApiError> {
        OrderStatus::parse(&self.status)
            .ok_or_else(|| ApiError::validation(format!("status: unknown value '{}'", self.status)))
    }
}

/// POST /api/v1/orders/:id/cancel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// POST /api/v1/payments/callback
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallbackRequest {
    pub order_id: Uuid,
    pub payment_ref: String,
    pub signature: String,
}

impl PaymentCallbackRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.payment_ref.is_empty() {
            return Err(ApiError::validation("payment_ref: must not be empty"));
        }
        if self.signature.is_empty() {
            return Err(ApiError::validation("signature: must not be empty"));
        }
        Ok(())
    }
}

/// POST /api/v1/inventory/adjust
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub op: StockOp,
    pub quantity: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

/// How to apply the quantity in an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockOp {
    Add,
    Remove,
    Set,
}

impl AdjustStockRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        match self.op {
            StockOp::Add | StockOp::Remove if self.quantity <= 0 => Err(ApiError::validation(
                "quantity: must be a positive integer for add/remove",
            )),
            StockOp::Set if self.quantity < 0 => {
                Err(ApiError::validation("quantity: must not be negative for set"))
            }
            _ => Ok(()),
        }
    }
}

/// GET /api/v1/inventory/logs
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Cart responses carry the snapshot lines plus derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub cart_id: Uuid,
    pub lines: Vec<CartLineResponse>,
    pub summary: CartSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineResponse {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// POST /api/v1/cart/merge response.
#[derive(Debug, Clone, Serialize)]
pub struct MergeResponse {
    pub cart_id: Uuid,
    pub report: MergeReport,
}

/// Order payload shared by checkout and order reads.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}
