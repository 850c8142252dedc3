//! Checkout and order lifecycle handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{CancelRequest, OrderResponse, TransitionRequest};
use crate::api::utils::identity_from_headers;
use crate::domain::OrderId;
use crate::server::AppState;

use super::carts::resolve_cart_id;

const DEFAULT_OPERATOR: &str = "operator";

/// POST /api/v1/checkout - Convert the caller's cart into a pending order.
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OrderResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let cart_id = resolve_cart_id(&state, &headers).await?;
    let order = state.orders.checkout(cart_id, &identity.to_string()).await?;
    Ok(Json(OrderResponse { order }))
}

/// GET /api/v1/orders/:order_id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order_id = OrderId::from_uuid(order_id);
    let order = state.orders.get_order(order_id).await?;
    let items = state.orders.get_order_items(order_id).await?;
    Ok(Json(serde_json::json!({
        "order": order,
        "items": items,
    })))
}

/// GET /api/v1/orders/:order_id/history - Audit trail, oldest first.
pub async fn get_order_history(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let history = state
        .orders
        .get_order_history(OrderId::from_uuid(order_id))
        .await?;
    let count = history.len();
    Ok(Json(serde_json::json!({
        "history": history,
        "count": count,
    })))
}

/// POST /api/v1/orders/:order_id/status - Operator-driven transition.
pub async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let new_status = req.parse_status()?;
    let actor = req.actor.as_deref().unwrap_or(DEFAULT_OPERATOR);
    let order = state
        .orders
        .transition_order(OrderId::from_uuid(order_id), new_status, actor, req.comment)
        .await?;
    Ok(Json(OrderResponse { order }))
}

/// POST /api/v1/orders/:order_id/cancel - Cancel and restock.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = req.actor.as_deref().unwrap_or(DEFAULT_OPERATOR);
    let order = state
        .orders
        .cancel_order(OrderId::from_uuid(order_id), actor, req.comment)
        .await?;
    Ok(Json(OrderResponse { order }))
}
