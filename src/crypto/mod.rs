//! Cryptographic utilities: payment callback signature verification.

mod signature;

pub use signature::{SignatureError, WebhookVerifier, DOMAIN_PAYMENT_CALLBACK};
