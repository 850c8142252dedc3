//! Payment reconciliation handlers.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::PaymentCallbackRequest;
use crate::domain::OrderId;
use crate::server::AppState;

/// POST /api/v1/payments/callback - Signed provider callback.
///
/// The signature gates everything: an invalid one is rejected before any
/// provider lookup or local write.
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(req): Json<PaymentCallbackRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;
    let outcome = state
        .reconciler
        .handle_callback(
            OrderId::from_uuid(req.order_id),
            &req.payment_ref,
            &req.signature,
        )
        .await?;
    Ok(Json(serde_json::json!({
        "order": outcome.order,
        "payment_status_changed": outcome.payment_status_changed,
        "order_confirmed": outcome.order_confirmed,
    })))
}

/// POST /api/v1/orders/:order_id/payment/sync - Pull provider state.
pub async fn sync_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .reconciler
        .sync_payment_status(OrderId::from_uuid(order_id))
        .await?;
    Ok(Json(serde_json::json!({
        "order": outcome.order,
        "payment_status_changed": outcome.payment_status_changed,
        "order_confirmed": outcome.order_confirmed,
    })))
}
