//! Payment provider state mapping.
//!
//! The provider's status vocabulary is wider than ours; reconciliation maps
//! it onto the local [`PaymentStatus`] axis and ignores states that carry
//! no local meaning yet (`created`, `authorized` stay `pending`).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::PaymentStatus;

/// Authoritative payment state as reported by the external provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPaymentState {
    Created,
    Authorized,
    Captured,
    Failed,
    Refunded,
}

impl ProviderPaymentState {
    /// Map the provider state to the local payment status axis.
    pub fn to_local(self) -> PaymentStatus {
        match self {
            ProviderPaymentState::Created | ProviderPaymentState::Authorized => {
                PaymentStatus::Pending
            }
            ProviderPaymentState::Captured => PaymentStatus::Paid,
            ProviderPaymentState::Failed => PaymentStatus::Failed,
            ProviderPaymentState::Refunded => PaymentStatus::Refunded,
        }
    }
}

impl fmt::Display for ProviderPaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderPaymentState::Created => "created",
            ProviderPaymentState::Authorized => "authorized",
            ProviderPaymentState::Captured => "captured",
            ProviderPaymentState::Failed => "failed",
            ProviderPaymentState::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// What the provider reports for one payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPaymentReport {
    pub payment_ref: String,
    pub state: ProviderPaymentState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_capture_states_stay_pending() {
        assert_eq!(ProviderPaymentState::Created.to_local(), PaymentStatus::Pending);
        assert_eq!(
            ProviderPaymentState::Authorized.to_local(),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn capture_failure_and_refund_map_directly() {
        assert_eq!(ProviderPaymentState::Captured.to_local(), PaymentStatus::Paid);
        assert_eq!(ProviderPaymentState::Failed.to_local(), PaymentStatus::Failed);
        assert_eq!(
            ProviderPaymentState::Refunded.to_local(),
            PaymentStatus::Refunded
        );
    }
}
