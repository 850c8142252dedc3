//! Core identifier types for the commerce core.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Product identifier.
    ProductId
);
uuid_id!(
    /// Product variant identifier.
    VariantId
);
uuid_id!(
    /// Cart identifier.
    CartId
);
uuid_id!(
    /// Cart line-item identifier.
    CartItemId
);
uuid_id!(
    /// Order identifier.
    OrderId
);
uuid_id!(
    /// Authenticated user identifier (issued by the auth collaborator).
    UserId
);

/// Who a cart belongs to: a guest session or an authenticated user.
///
/// Exactly one identity is active per cart; the guest/user merge on login
/// collapses the session cart into the user cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartIdentity {
    /// Anonymous cart keyed by an opaque session token.
    Session(String),
    /// Cart owned by an authenticated user.
    User(UserId),
}

impl CartIdentity {
    pub fn session_token(&self) -> Option<&str> {
        match self {
            CartIdentity::Session(token) => Some(token),
            CartIdentity::User(_) => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CartIdentity::Session(_) => None,
            CartIdentity::User(id) => Some(*id),
        }
    }
}

impl fmt::Display for CartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartIdentity::Session(token) => write!(f, "session:{token}"),
            CartIdentity::User(id) => write!(f, "user:{id}"),
        }
    }
}
