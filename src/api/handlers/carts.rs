//! Cart handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    AddItemRequest, CartLineResponse, CartResponse, MergeResponse, UpdateItemRequest,
};
use crate::api::utils::{identity_from_headers, session_token_from_headers, user_id_from_headers};
use crate::domain::{calculate_cart_summary, CartId, CartItemId, CartSnapshot, ProductId, VariantId};
use crate::server::AppState;

fn cart_response(snapshot: CartSnapshot) -> CartResponse {
    let summary = calculate_cart_summary(&snapshot);
    CartResponse {
        cart_id: snapshot.cart.id.0,
        lines: snapshot
            .lines
            .into_iter()
            .map(|line| CartLineResponse {
                item_id: line.id.0,
                product_id: line.product_id.0,
                variant_id: line.variant_id.map(|v| v.0),
                name: line.name,
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
            })
            .collect(),
        summary,
    }
}

/// GET /api/v1/cart - The caller's open cart with live prices and totals.
pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let cart = state.carts.get_or_create_cart(&identity).await?;
    let snapshot = state.carts.load_cart(cart.id).await?;
    Ok(Json(cart_response(snapshot)))
}

/// POST /api/v1/cart/items - Add a quantity of a product to the cart.
pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    req.validate()?;
    let identity = identity_from_headers(&headers)?;
    let cart = state.carts.get_or_create_cart(&identity).await?;
    state
        .carts
        .add_to_cart(
            cart.id,
            ProductId::from_uuid(req.product_id),
            req.variant_id.map(VariantId::from_uuid),
            req.quantity,
        )
        .await?;
    let snapshot = state.carts.load_cart(cart.id).await?;
    Ok(Json(cart_response(snapshot)))
}

/// PATCH /api/v1/cart/items/:item_id - Set a line quantity (<= 0 removes).
pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let cart = state.carts.get_or_create_cart(&identity).await?;
    state
        .carts
        .update_cart_item(cart.id, CartItemId::from_uuid(item_id), req.quantity)
        .await?;
    let snapshot = state.carts.load_cart(cart.id).await?;
    Ok(Json(cart_response(snapshot)))
}

/// DELETE /api/v1/cart/items/:item_id - Remove a line (idempotent).
pub async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let cart = state.carts.get_or_create_cart(&identity).await?;
    state
        .carts
        .remove_from_cart(cart.id, CartItemId::from_uuid(item_id))
        .await?;
    let snapshot = state.carts.load_cart(cart.id).await?;
    Ok(Json(cart_response(snapshot)))
}

/// DELETE /api/v1/cart - Delete all lines; the cart survives.
pub async fn clear_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let cart = state.carts.get_or_create_cart(&identity).await?;
    state.carts.clear_cart(cart.id).await?;
    let snapshot = state.carts.load_cart(cart.id).await?;
    Ok(Json(cart_response(snapshot)))
}

/// POST /api/v1/cart/merge - Merge the guest session cart into the user's
/// cart on login. Requires both identity headers.
pub async fn merge_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MergeResponse>, ApiError> {
    let session_token = session_token_from_headers(&headers)?;
    let user_id = user_id_from_headers(&headers)?;

    let report = state.carts.merge_guest_cart(&session_token, user_id).await?;
    let cart = state
        .carts
        .get_or_create_cart(&crate::domain::CartIdentity::User(user_id))
        .await?;
    Ok(Json(MergeResponse {
        cart_id: cart.id.0,
        report,
    }))
}

/// Fetch the caller's cart id, creating the cart if needed.
pub(crate) async fn resolve_cart_id(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<CartId, ApiError> {
    let identity = identity_from_headers(headers)?;
    Ok(state.carts.get_or_create_cart(&identity).await?.id)
}
