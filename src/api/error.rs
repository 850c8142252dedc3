//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::CommerceError;

/// Machine-readable error codes for API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body or parameter is malformed
    ValidationFailed,
    /// Referenced product not found or inactive
    ProductNotFound,
    /// Referenced variant not found or inactive
    VariantNotFound,
    /// Cart not found
    CartNotFound,
    /// Cart item not found
    CartItemNotFound,
    /// Order not found
    OrderNotFound,
    /// Requested quantity exceeds on-hand stock
    InsufficientStock,
    /// Illegal order-status transition
    InvalidTransition,
    /// Payment signature verification failed
    PaymentVerificationFailed,
    /// Payment provider unavailable or errored
    PaymentProviderError,
    /// Unexpected server error
    InternalError,
}

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::ProductNotFound
            | ErrorCode::VariantNotFound
            | ErrorCode::CartNotFound
            | ErrorCode::CartItemNotFound
            | ErrorCode::OrderNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock | ErrorCode::InvalidTransition => StatusCode::CONFLICT,
            ErrorCode::PaymentVerificationFailed => StatusCode::UNAUTHORIZED,
            ErrorCode::PaymentProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        let code = match &err {
            CommerceError::Validation(_) => ErrorCode::ValidationFailed,
            CommerceError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            CommerceError::VariantNotFound(_) => ErrorCode::VariantNotFound,
            CommerceError::CartNotFound(_) => ErrorCode::CartNotFound,
            CommerceError::CartItemNotFound(_) => ErrorCode::CartItemNotFound,
            CommerceError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            CommerceError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CommerceError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            CommerceError::PaymentVerification(_) => ErrorCode::PaymentVerificationFailed,
            CommerceError::PaymentProvider(_) => ErrorCode::PaymentProviderError,
            CommerceError::Database(_) | CommerceError::Internal(_) => ErrorCode::InternalError,
        };
        // Don't leak backend detail on internal errors.
        let message = match code {
            ErrorCode::InternalError => {
                tracing::error!(error = %err, "internal error");
                "internal error".to_string()
            }
            _ => err.to_string(),
        };
        Self::new(code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderStatus, ProductId};

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let api: ApiError = CommerceError::InsufficientStock {
            product_id: ProductId::new(),
            variant_id: None,
            requested: 5,
            available: 2,
        }
        .into();
        assert_eq!(api.code, ErrorCode::InsufficientStock);
        assert_eq!(api.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let api: ApiError = CommerceError::InvalidTransition {
            order_id: OrderId::new(),
            from: OrderStatus::Delivered,
            to: OrderStatus::Preparing,
        }
        .into();
        assert_eq!(api.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let api: ApiError = CommerceError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(api.code, ErrorCode::InternalError);
        assert_eq!(api.message, "internal error");
    }
}
