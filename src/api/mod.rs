//! REST API: router, handlers, request/response types, error mapping.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::server::AppState;

pub mod error;
pub mod handlers;
pub mod types;
pub mod utils;

use handlers::{carts, inventory, orders, payments};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cart", get(carts::get_cart))
        .route("/v1/cart", delete(carts::clear_cart))
        .route("/v1/cart/items", post(carts::add_item))
        .route("/v1/cart/items/:item_id", patch(carts::update_item))
        .route("/v1/cart/items/:item_id", delete(carts::remove_item))
        .route("/v1/cart/merge", post(carts::merge_cart))
        .route("/v1/checkout", post(orders::checkout))
        .route("/v1/orders/:order_id", get(orders::get_order))
        .route("/v1/orders/:order_id/history", get(orders::get_order_history))
        .route("/v1/orders/:order_id/status", post(orders::transition_order))
        .route("/v1/orders/:order_id/cancel", post(orders::cancel_order))
        .route(
            "/v1/orders/:order_id/payment/sync",
            post(payments::sync_payment),
        )
        .route("/v1/payments/callback", post(payments::payment_callback))
        .route("/v1/inventory/adjust", post(inventory::adjust_stock))
        .route("/v1/inventory/summary", get(inventory::get_summary))
        .route("/v1/inventory/logs", get(inventory::get_logs))
        .route("/v1/inventory/low-stock", get(inventory::get_low_stock))
        .route(
            "/v1/inventory/out-of-stock",
            get(inventory::get_out_of_stock),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use crate::crypto::WebhookVerifier;
    use crate::domain::{Cart, CartIdentity, CartSnapshot, ProductId};
    use crate::infra::{
        CommerceError, MockCartStore, MockInventoryLedger, MockOrderStore,
    };
    use crate::payment::{MockPaymentProvider, PaymentReconciler};
    use crate::server::{app, AppState};

    fn state(carts: MockCartStore) -> AppState {
        let orders: Arc<dyn crate::infra::OrderStore> = Arc::new(MockOrderStore::new());
        AppState {
            carts: Arc::new(carts),
            inventory: Arc::new(MockInventoryLedger::new()),
            orders: orders.clone(),
            reconciler: Arc::new(PaymentReconciler::new(
                Arc::new(MockPaymentProvider::new()),
                orders,
                WebhookVerifier::new("test-secret"),
            )),
        }
    }

    fn cart_for(identity: &CartIdentity) -> Cart {
        Cart {
            id: crate::domain::CartId::new(),
            session_token: identity.session_token().map(str::to_string),
            user_id: identity.user_id(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let router = app(state(MockCartStore::new()));
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cart_without_identity_headers_is_rejected() {
        let router = app(state(MockCartStore::new()));
        let response = router
            .oneshot(Request::get("/api/v1/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn cart_with_session_header_round_trips() {
        let mut carts = MockCartStore::new();
        carts.expect_get_or_create_cart().returning(|identity| {
            Ok(cart_for(identity))
        });
        carts.expect_load_cart().returning(|cart_id| {
            Ok(CartSnapshot {
                cart: Cart {
                    id: cart_id,
                    session_token: Some("sess-1".to_string()),
                    user_id: None,
                    created_at: chrono::Utc::now(),
                    updated_at: chrono::Utc::now(),
                },
                lines: vec![],
            })
        });

        let router = app(state(carts));
        let response = router
            .oneshot(
                Request::get("/api/v1/cart")
                    .header("x-session-token", "sess-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["summary"]["item_count"], 0);
        assert_eq!(json["summary"]["subtotal_cents"], 0);
    }

    #[tokio::test]
    async fn insufficient_stock_maps_to_conflict() {
        let mut carts = MockCartStore::new();
        carts
            .expect_get_or_create_cart()
            .returning(|identity| Ok(cart_for(identity)));
        carts.expect_add_to_cart().returning(|_, product_id, _, _| {
            Err(CommerceError::InsufficientStock {
                product_id,
                variant_id: None,
                requested: 3,
                available: 1,
            })
        });

        let product_id = ProductId::new();
        let payload = serde_json::json!({
            "product_id": product_id.0,
            "quantity": 3,
        });

        let router = app(state(carts));
        let response = router
            .oneshot(
                Request::post("/api/v1/cart/items")
                    .header("x-session-token", "sess-1")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
    }

    #[tokio::test]
    async fn unsigned_payment_callback_is_unauthorized() {
        let router = app(state(MockCartStore::new()));
        let payload = serde_json::json!({
            "order_id": uuid::Uuid::new_v4(),
            "payment_ref": "pay-1",
            "signature": "deadbeef",
        });
        let response = router
            .oneshot(
                Request::post("/api/v1/payments/callback")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
