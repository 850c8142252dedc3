//! Payment callback signature verification.
//!
//! The provider signs `{order_ref}|{payment_ref}` with HMAC-SHA256 under a
//! shared webhook secret and sends the hex digest alongside the callback.
//! Verification fails closed: malformed hex, wrong length and digest
//! mismatch are all the same `VerificationFailed` outcome to the caller.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Domain prefix mixed into every callback MAC.
pub const DOMAIN_PAYMENT_CALLBACK: &[u8] = b"PAYMENT_CALLBACK_V1";

/// Error type for signature operations
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature format")]
    InvalidFormat,

    #[error("signature verification failed")]
    VerificationFailed,
}

/// Verifier for provider callback signatures.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, order_ref: &str, payment_ref: &str) -> HmacSha256 {
        // Key sizes are unrestricted for HMAC; new_from_slice on SHA-256
        // cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
        mac.update(DOMAIN_PAYMENT_CALLBACK);
        mac.update(b"|");
        mac.update(order_ref.as_bytes());
        mac.update(b"|");
        mac.update(payment_ref.as_bytes());
        mac
    }

    /// Produce the hex signature for a callback (used by tests and by the
    /// provider's side of the contract).
    pub fn sign(&self, order_ref: &str, payment_ref: &str) -> String {
        hex::encode(self.mac(order_ref, payment_ref).finalize().into_bytes())
    }

    /// Verify a hex-encoded callback signature in constant time.
    pub fn verify(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature_hex: &str,
    ) -> Result<(), SignatureError> {
        let signature = hex::decode(signature_hex).map_err(|_| SignatureError::InvalidFormat)?;
        self.mac(order_ref, payment_ref)
            .verify_slice(&signature)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}
