//! Small helpers shared by handlers.

use axum::http::HeaderMap;
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::{CartIdentity, UserId};

pub const SESSION_HEADER: &str = "x-session-token";
pub const USER_HEADER: &str = "x-user-id";

/// Resolve the cart identity from trusted headers supplied by the edge.
///
/// An authenticated user wins over a session token when both are present
/// (the merge endpoint is how the two get reconciled).
pub fn identity_from_headers(headers: &HeaderMap) -> Result<CartIdentity, ApiError> {
    if let Some(value) = headers.get(USER_HEADER) {
        let raw = value
            .to_str()
            .map_err(|_| ApiError::validation("x-user-id: not valid ascii"))?;
        let id = Uuid::parse_str(raw)
            .map_err(|_| ApiError::validation("x-user-id: not a valid uuid"))?;
        return Ok(CartIdentity::User(UserId::from_uuid(id)));
    }
    if let Some(value) = headers.get(SESSION_HEADER) {
        let token = value
            .to_str()
            .map_err(|_| ApiError::validation("x-session-token: not valid ascii"))?;
        if token.is_empty() {
            return Err(ApiError::validation("x-session-token: must not be empty"));
        }
        return Ok(CartIdentity::Session(token.to_string()));
    }
    Err(ApiError::validation(
        "either x-user-id or x-session-token is required",
    ))
}

pub fn session_token_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(SESSION_HEADER)
        .ok_or_else(|| ApiError::validation("x-session-token is required"))?;
    let token = value
        .to_str()
        .map_err(|_| ApiError::validation("x-session-token: not valid ascii"))?;
    if token.is_empty() {
        return Err(ApiError::validation("x-session-token: must not be empty"));
    }
    Ok(token.to_string())
}

pub fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get(USER_HEADER)
        .ok_or_else(|| ApiError::validation("x-user-id is required"))?;
    let raw = value
        .to_str()
        .map_err(|_| ApiError::validation("x-user-id: not valid ascii"))?;
    let id = Uuid::parse_str(raw)
        .map_err(|_| ApiError::validation("x-user-id: not a valid uuid"))?;
    Ok(UserId::from_uuid(id))
}
