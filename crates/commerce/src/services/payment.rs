//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::{ListingId, Money};
use domain::ShippingSelection;

use crate::error::{CommerceError, Result};

/// Gateway-reported state of an external payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Rejected,
}

/// The purchase details attached to a hosted-checkout preference and read
/// back on confirmation. Once the payment is approved this is the trusted
/// source of truth for what was purchased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub listing_ids: Vec<ListingId>,
    pub shipping: ShippingSelection,
}

/// An external payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: String,
    pub status: PaymentStatus,
    pub metadata: Option<PaymentMetadata>,
}

/// A hosted-checkout preference created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntent {
    /// Gateway-side preference identifier.
    pub preference_id: String,
    /// Our reference attached to the preference, later echoed back on the
    /// payment.
    pub external_reference: String,
    /// Where to send the buyer to complete payment.
    pub checkout_url: String,
}

/// Trait for external payment operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Looks up a payment by its gateway identifier.
    async fn payment(&self, payment_id: &str) -> Result<Option<PaymentRecord>>;

    /// Creates a hosted-checkout preference for the given total, carrying
    /// the purchase metadata for later confirmation.
    async fn create_preference(
        &self,
        total: Money,
        external_reference: &str,
        metadata: PaymentMetadata,
    ) -> Result<PaymentIntent>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    payments: HashMap<String, PaymentRecord>,
    next_id: u32,
    fail: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail every call.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Registers a payment the gateway will report, returning its id.
    pub fn register_payment(
        &self,
        status: PaymentStatus,
        metadata: Option<PaymentMetadata>,
    ) -> String {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        let id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(id.clone(), PaymentRecord { id: id.clone(), status, metadata });
        id
    }

    /// Returns the number of registered preferences and payments.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn payment(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let state = self.state.read().unwrap();
        if state.fail {
            return Err(CommerceError::PaymentGateway("gateway unavailable".to_string()));
        }
        Ok(state.payments.get(payment_id).cloned())
    }

    async fn create_preference(
        &self,
        _total: Money,
        external_reference: &str,
        _metadata: PaymentMetadata,
    ) -> Result<PaymentIntent> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(CommerceError::PaymentGateway("gateway unavailable".to_string()));
        }
        state.next_id += 1;
        let preference_id = format!("PREF-{:04}", state.next_id);
        Ok(PaymentIntent {
            checkout_url: format!("https://pay.example/checkout/{preference_id}"),
            preference_id,
            external_reference: external_reference.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_payment_is_reported_back() {
        let gateway = InMemoryPaymentGateway::new();
        let id = gateway.register_payment(PaymentStatus::Approved, None);

        let record = gateway.payment(&id).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Approved);
        assert!(gateway.payment("PAY-9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_gateway_surfaces_gateway_error() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail(true);

        let err = gateway.payment("PAY-0001").await.unwrap_err();
        assert_eq!(err.kind(), "payment_gateway");
    }
}
