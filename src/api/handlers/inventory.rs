//! Inventory handlers.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AdjustStockRequest, LogsQuery, StockOp};
use crate::domain::{ProductId, StockChangeReason, StockMeta, VariantId};
use crate::server::AppState;

/// POST /api/v1/inventory/adjust - Operator stock adjustment.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;
    let product_id = ProductId::from_uuid(req.product_id);
    let variant_id = req.variant_id.map(VariantId::from_uuid);

    let entry = match req.op {
        StockOp::Add => {
            let meta = match &req.reference {
                Some(reference) => {
                    StockMeta::with_reference(StockChangeReason::Restock, reference.clone())
                }
                None => StockMeta::new(StockChangeReason::Restock),
            };
            state
                .inventory
                .add_stock(product_id, variant_id, req.quantity, meta)
                .await?
        }
        StockOp::Remove => {
            let meta = match &req.reference {
                Some(reference) => {
                    StockMeta::with_reference(StockChangeReason::Manual, reference.clone())
                }
                None => StockMeta::new(StockChangeReason::Manual),
            };
            state
                .inventory
                .remove_stock(product_id, variant_id, req.quantity, meta)
                .await?
        }
        StockOp::Set => {
            let meta = match &req.reference {
                Some(reference) => {
                    StockMeta::with_reference(StockChangeReason::Correction, reference.clone())
                }
                None => StockMeta::new(StockChangeReason::Correction),
            };
            state
                .inventory
                .set_stock(product_id, variant_id, req.quantity, meta)
                .await?
        }
    };

    Ok(Json(serde_json::json!({ "entry": entry })))
}

/// GET /api/v1/inventory/summary
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.inventory.get_inventory_summary().await?;
    Ok(Json(serde_json::json!({ "summary": summary })))
}

/// GET /api/v1/inventory/logs
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let logs = state
        .inventory
        .get_inventory_logs(
            query.product_id.map(ProductId::from_uuid),
            query.limit.unwrap_or(100),
        )
        .await?;
    let count = logs.len();
    Ok(Json(serde_json::json!({ "logs": logs, "count": count })))
}

/// GET /api/v1/inventory/low-stock
pub async fn get_low_stock(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = state.inventory.get_low_stock_products().await?;
    Ok(Json(serde_json::json!({ "products": products })))
}

/// GET /api/v1/inventory/out-of-stock
pub async fn get_out_of_stock(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let products = state.inventory.get_out_of_stock_products().await?;
    Ok(Json(serde_json::json!({ "products": products })))
}
