//! Payment reconciliation.
//!
//! The external provider is authoritative for payment state. This module
//! verifies callback signatures (fail closed) and synchronizes the local
//! payment status idempotently: a sync with no provider-side change writes
//! nothing and appends no history.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{info, instrument};

use crate::crypto::WebhookVerifier;
use crate::domain::{OrderId, ProviderPaymentReport};
use crate::infra::{CommerceError, OrderStore, PaymentSyncOutcome, Result};

/// External payment provider lookup.
///
/// The HTTP client lives outside the core; deployments wire their gateway
/// here, tests wire a mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch the authoritative payment state for an order.
    async fn fetch_payment(&self, order_id: OrderId) -> Result<ProviderPaymentReport>;
}

/// Stand-in provider for deployments without a configured gateway.
///
/// Every lookup fails, which keeps orders at their current payment status
/// rather than inventing one.
#[derive(Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl PaymentProvider for UnconfiguredProvider {
    async fn fetch_payment(&self, _order_id: OrderId) -> Result<ProviderPaymentReport> {
        Err(CommerceError::PaymentProvider(
            "no payment provider configured".to_string(),
        ))
    }
}

/// Synchronizes local payment state with the provider.
pub struct PaymentReconciler {
    provider: Arc<dyn PaymentProvider>,
    orders: Arc<dyn OrderStore>,
    verifier: WebhookVerifier,
}

impl PaymentReconciler {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        orders: Arc<dyn OrderStore>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            provider,
            orders,
            verifier,
        }
    }

    /// Verify a provider callback signature. Fails closed.
    pub fn verify_payment_signature(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<()> {
        self.verifier
            .verify(order_ref, payment_ref, signature)
            .map_err(|e| CommerceError::PaymentVerification(e.to_string()))
    }

    /// Pull the provider's state for an order and apply it locally.
    ///
    /// Idempotent: the order store writes (and logs history) only when the
    /// mapped status differs from the stored one, so calling this twice
    /// with the same provider state is a no-op the second time.
    #[instrument(skip(self))]
    pub async fn sync_payment_status(&self, order_id: OrderId) -> Result<PaymentSyncOutcome> {
        let report = self.provider.fetch_payment(order_id).await?;
        let local = report.state.to_local();

        let outcome = self
            .orders
            .apply_payment_status(order_id, local, Some(report.payment_ref))
            .await?;

        if outcome.payment_status_changed {
            info!(
                order_id = %order_id,
                payment_status = %local,
                confirmed = outcome.order_confirmed,
                "payment status synchronized"
            );
        }
        Ok(outcome)
    }

    /// Handle a signed provider callback: verify, then sync.
    pub async fn handle_callback(
        &self,
        order_id: OrderId,
        payment_ref: &str,
        signature: &str,
    ) -> Result<PaymentSyncOutcome> {
        self.verify_payment_signature(&order_id.to_string(), payment_ref, signature)?;
        self.sync_payment_status(order_id).await
    }
}
