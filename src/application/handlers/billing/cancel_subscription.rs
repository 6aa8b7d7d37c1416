//! CancelSubscriptionHandler - marks a subscription canceled locally, then
//! cancels it on the provider.
//!
//! The local record is authoritative for product access, so it is canceled
//! first. When no local record exists the provider is never called; the
//! subscription is not ours to touch.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::DomainError;
use crate::ports::{PaymentProvider, SubscriptionStore};

/// Outcome of a cancel request.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    /// Record moved to canceled; provider cancel was issued.
    Canceled(SubscriptionRecord),
    /// Record was already canceled; nothing was done.
    AlreadyCanceled(SubscriptionRecord),
    /// No local record with that subscription id.
    NotFound,
}

pub struct CancelSubscriptionHandler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn handle(&self, subscription_id: &str) -> Result<CancelOutcome, DomainError> {
        let record = match self.store.find_by_subscription_id(subscription_id).await? {
            Some(record) => record,
            None => return Ok(CancelOutcome::NotFound),
        };

        if record.status.is_canceled() {
            return Ok(CancelOutcome::AlreadyCanceled(record));
        }

        let canceled = self
            .store
            .cancel(subscription_id)
            .await?
            .unwrap_or(record);

        // The provider cancel is best-effort once the local record is
        // canceled; a failure leaves the remote side to ops tooling.
        match self.provider.cancel_subscription(subscription_id).await {
            Ok(_) => {
                info!(subscription_id, "subscription canceled");
            }
            Err(e) => {
                error!(subscription_id, error = %e,
                    "provider cancel failed after local cancel");
            }
        }

        Ok(CancelOutcome::Canceled(canceled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::subscription::test_record;
    use crate::domain::billing::{LatestInvoice, PaymentIntentObject, SubscriptionStatus};
    use crate::ports::subscription_store::test_support::InMemorySubscriptionStore;
    use crate::ports::{
        CreateCustomerRequest, CreateSubscriptionRequest, PaymentError, ProviderCustomer,
        ProviderSchedule, ProviderSubscription,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockProvider {
        cancel_calls: AtomicU32,
        fail_cancel: bool,
    }

    impl MockProvider {
        fn new(fail_cancel: bool) -> Self {
            Self {
                cancel_calls: AtomicU32::new(0),
                fail_cancel,
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockProvider {
        async fn create_customer(
            &self,
            _request: CreateCustomerRequest,
        ) -> Result<ProviderCustomer, PaymentError> {
            unimplemented!("not used by cancel handler")
        }

        async fn create_subscription(
            &self,
            _request: CreateSubscriptionRequest,
        ) -> Result<ProviderSubscription, PaymentError> {
            unimplemented!("not used by cancel handler")
        }

        async fn cancel_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSubscription, PaymentError> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_cancel {
                return Err(PaymentError::network("connection reset"));
            }
            Ok(ProviderSubscription {
                id: subscription_id.to_string(),
                customer_id: "cus_1".to_string(),
                status: "canceled".to_string(),
                current_period_start: 1_704_067_200,
                current_period_end: 1_706_745_600,
                currency: "usd".to_string(),
                latest_invoice: LatestInvoice::default(),
            })
        }

        async fn create_subscription_schedule(
            &self,
            _subscription_id: &str,
        ) -> Result<ProviderSchedule, PaymentError> {
            unimplemented!("not used by cancel handler")
        }

        async fn get_payment_intent(
            &self,
            _payment_intent_id: &str,
        ) -> Result<PaymentIntentObject, PaymentError> {
            unimplemented!("not used by cancel handler")
        }
    }

    #[tokio::test]
    async fn cancels_locally_and_remotely() {
        let store = Arc::new(
            InMemorySubscriptionStore::new()
                .with_record(test_record("sub_1", "pi_1"))
                .await,
        );
        let provider = Arc::new(MockProvider::new(false));
        let handler = CancelSubscriptionHandler::new(store.clone(), provider.clone());

        let outcome = handler.handle("sub_1").await.unwrap();
        assert!(matches!(outcome, CancelOutcome::Canceled(_)));
        assert_eq!(provider.cancel_calls.load(Ordering::SeqCst), 1);

        let record = store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn missing_record_skips_provider_entirely() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let provider = Arc::new(MockProvider::new(false));
        let handler = CancelSubscriptionHandler::new(store, provider.clone());

        let outcome = handler.handle("sub_ghost").await.unwrap();
        assert!(matches!(outcome, CancelOutcome::NotFound));
        assert_eq!(provider.cancel_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_cancel_is_a_no_op() {
        let store = Arc::new(
            InMemorySubscriptionStore::new()
                .with_record(test_record("sub_1", "pi_1"))
                .await,
        );
        let provider = Arc::new(MockProvider::new(false));
        let handler = CancelSubscriptionHandler::new(store, provider.clone());

        handler.handle("sub_1").await.unwrap();
        let outcome = handler.handle("sub_1").await.unwrap();

        assert!(matches!(outcome, CancelOutcome::AlreadyCanceled(_)));
        assert_eq!(provider.cancel_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_still_cancels_locally() {
        let store = Arc::new(
            InMemorySubscriptionStore::new()
                .with_record(test_record("sub_1", "pi_1"))
                .await,
        );
        let provider = Arc::new(MockProvider::new(true));
        let handler = CancelSubscriptionHandler::new(store.clone(), provider);

        let outcome = handler.handle("sub_1").await.unwrap();
        assert!(matches!(outcome, CancelOutcome::Canceled(_)));

        let record = store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
    }
}
