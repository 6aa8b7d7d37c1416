//! Handler for `payment_intent.*` events.
//!
//! Reconciles the payment intent carried by the event against the stored
//! subscription record, then notifies the customer and the ops mailbox.
//! Notification failures are logged and never fail the event.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::billing::locale::{format_amount, language_for_currency};
use crate::domain::billing::notification::{
    ops_payment_summary_email, payment_failed_email, payment_succeeded_email, EmailMessage,
};
use crate::domain::billing::{
    EventCategory, PaymentIntentKind, PaymentIntentObject, PlanCatalog, ProviderEvent,
    SubscriptionPatch, SubscriptionRecord, SubscriptionStatus, WebhookError,
};
use crate::ports::{NotificationSender, PaymentProvider, SubscriptionStore, UserDirectory};

use super::process_webhook::WebhookEventHandler;

pub struct PaymentIntentEventHandler {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProvider>,
    mailer: Arc<dyn NotificationSender>,
    catalog: PlanCatalog,
    ops_email: String,
}

impl PaymentIntentEventHandler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn NotificationSender>,
        catalog: PlanCatalog,
        ops_email: String,
    ) -> Self {
        Self {
            users,
            store,
            provider,
            mailer,
            catalog,
            ops_email,
        }
    }

    /// On the first successful payment, turn the subscription into a
    /// schedule so later phase changes are possible. A failure here is
    /// logged and the event still succeeds; the next delivery retries.
    async fn ensure_schedule(&self, record: &SubscriptionRecord) {
        if record.schedule_id.is_some() {
            return;
        }
        match self
            .provider
            .create_subscription_schedule(&record.subscription_id)
            .await
        {
            Ok(schedule) => {
                info!(subscription_id = %record.subscription_id, schedule_id = %schedule.id,
                    "created subscription schedule");
                if let Err(e) = self
                    .store
                    .update(
                        &record.subscription_id,
                        SubscriptionPatch::default().with_schedule_id(schedule.id),
                    )
                    .await
                {
                    error!(subscription_id = %record.subscription_id, error = %e,
                        "failed to persist schedule id");
                }
            }
            Err(e) => {
                warn!(subscription_id = %record.subscription_id, error = %e,
                    "subscription schedule creation failed");
            }
        }
    }

    async fn send_logged(&self, message: EmailMessage) {
        if let Err(e) = self.mailer.send(&message).await {
            error!(to = %message.to, subject = %message.subject, error = %e,
                "notification send failed");
        }
    }
}

#[async_trait]
impl WebhookEventHandler for PaymentIntentEventHandler {
    fn handles(&self, category: &EventCategory) -> bool {
        matches!(category, EventCategory::PaymentIntent(_))
    }

    async fn handle(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let kind = match event.category() {
            EventCategory::PaymentIntent(kind) => kind,
            other => {
                return Err(WebhookError::Ignored(format!(
                    "payment intent handler got {:?}",
                    other
                )))
            }
        };

        let intent: PaymentIntentObject = event
            .payment_intent()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        // Events without a receipt email cannot be tied to an account.
        let email = match intent.receipt_email.as_deref() {
            Some(email) => email,
            None => {
                return Err(WebhookError::Ignored(
                    "payment intent has no receipt email".to_string(),
                ))
            }
        };

        // An unknown email is normal (payments from outside this product
        // share the provider account) and skipped without noise.
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                return Err(WebhookError::Ignored(format!(
                    "no user account for receipt email on intent {}",
                    intent.id
                )))
            }
        };

        let record = match self.store.find_by_payment_intent(&intent.id).await? {
            Some(record) => record,
            None => {
                warn!(payment_intent_id = %intent.id, user_id = %user.id,
                    "no subscription record for payment intent");
                return Err(WebhookError::Ignored(format!(
                    "no subscription record for payment intent {}",
                    intent.id
                )));
            }
        };

        let status = SubscriptionStatus::parse(&intent.status);
        let amount = format_amount(intent.amount_received, &intent.currency);
        // The payment's own currency decides the language, not whatever
        // currency the record was created with.
        let language = language_for_currency(&intent.currency);

        let updated = self
            .store
            .update(
                &record.subscription_id,
                SubscriptionPatch::status(status).with_payment_intent(intent.clone()),
            )
            .await?;
        if updated.is_none() {
            // Record vanished between lookup and update; nothing to do.
            warn!(subscription_id = %record.subscription_id,
                "subscription record disappeared during update");
            return Err(WebhookError::Ignored(format!(
                "subscription record {} no longer exists",
                record.subscription_id
            )));
        }

        info!(event_id = %event.id, payment_intent_id = %intent.id,
            subscription_id = %record.subscription_id, status = %status.as_str(),
            "payment intent reconciled");

        if kind.is_failure() {
            self.send_logged(payment_failed_email(language, email, &amount))
                .await;
            return Ok(());
        }

        if kind == PaymentIntentKind::Succeeded {
            self.ensure_schedule(&record).await;

            self.send_logged(payment_succeeded_email(language, email, &amount))
                .await;
            self.send_logged(ops_payment_summary_email(
                &self.ops_email,
                email,
                &amount,
                &self.catalog.plan_label(&record.price_id),
            ))
            .await;
        }

        // Created / Processing / RequiresAction: status write only.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::plan::test_catalog;
    use crate::domain::billing::provider_event::test_support::{event, payment_intent_object};
    use crate::domain::billing::subscription::test_record;
    use crate::domain::foundation::UserId;
    use crate::ports::notification_sender::test_support::RecordingSender;
    use crate::ports::subscription_store::test_support::InMemorySubscriptionStore;
    use crate::ports::user_directory::test_support::InMemoryUserDirectory;
    use crate::ports::{
        CreateCustomerRequest, CreateSubscriptionRequest, PaymentError, ProviderCustomer,
        ProviderSchedule, ProviderSubscription,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockProvider {
        schedule_calls: AtomicU32,
        fail_schedule: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                schedule_calls: AtomicU32::new(0),
                fail_schedule: false,
            }
        }

        fn failing_schedule() -> Self {
            Self {
                schedule_calls: AtomicU32::new(0),
                fail_schedule: true,
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockProvider {
        async fn create_customer(
            &self,
            _request: CreateCustomerRequest,
        ) -> Result<ProviderCustomer, PaymentError> {
            unimplemented!("not used by payment intent handler")
        }

        async fn create_subscription(
            &self,
            _request: CreateSubscriptionRequest,
        ) -> Result<ProviderSubscription, PaymentError> {
            unimplemented!("not used by payment intent handler")
        }

        async fn cancel_subscription(
            &self,
            _subscription_id: &str,
        ) -> Result<ProviderSubscription, PaymentError> {
            unimplemented!("not used by payment intent handler")
        }

        async fn create_subscription_schedule(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSchedule, PaymentError> {
            self.schedule_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_schedule {
                return Err(PaymentError::provider("schedule creation refused"));
            }
            Ok(ProviderSchedule {
                id: "sub_sched_1".to_string(),
                subscription_id: subscription_id.to_string(),
            })
        }

        async fn get_payment_intent(
            &self,
            _payment_intent_id: &str,
        ) -> Result<PaymentIntentObject, PaymentError> {
            unimplemented!("not used by payment intent handler")
        }
    }

    struct Fixture {
        handler: PaymentIntentEventHandler,
        store: Arc<InMemorySubscriptionStore>,
        mailer: Arc<RecordingSender>,
        provider: Arc<MockProvider>,
    }

    async fn fixture_with(provider: MockProvider, mailer: RecordingSender) -> Fixture {
        let user_id = UserId::new();
        let users = Arc::new(
            InMemoryUserDirectory::new().with_user("user@example.com", user_id),
        );
        let mut record = test_record("sub_1", "pi_1");
        record.user_id = user_id;
        let store = Arc::new(InMemorySubscriptionStore::new().with_record(record).await);
        let mailer = Arc::new(mailer);
        let provider = Arc::new(provider);

        let handler = PaymentIntentEventHandler::new(
            users,
            store.clone(),
            provider.clone(),
            mailer.clone(),
            test_catalog(),
            "payments@subhub.app".to_string(),
        );
        Fixture {
            handler,
            store,
            mailer,
            provider,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MockProvider::new(), RecordingSender::new()).await
    }

    fn succeeded_event() -> ProviderEvent {
        event(
            "evt_1",
            "payment_intent.succeeded",
            payment_intent_object("pi_1", "succeeded", Some("user@example.com")),
        )
    }

    fn failed_event() -> ProviderEvent {
        event(
            "evt_2",
            "payment_intent.payment_failed",
            payment_intent_object("pi_1", "requires_payment_method", Some("user@example.com")),
        )
    }

    #[tokio::test]
    async fn success_updates_record_and_sends_two_emails() {
        let fx = fixture().await;

        fx.handler.handle(&succeeded_event()).await.unwrap();

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Succeeded);
        assert_eq!(
            record.latest_invoice.payment_intent.unwrap().amount_received,
            2000
        );

        let sent = fx.mailer.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "user@example.com");
        assert!(sent[0].text.contains("$20.00"));
        assert_eq!(sent[1].to, "payments@subhub.app");
        assert!(sent[1].subject.contains("Pro (monthly)"));
    }

    #[tokio::test]
    async fn success_creates_schedule_once() {
        let fx = fixture().await;

        fx.handler.handle(&succeeded_event()).await.unwrap();
        assert_eq!(fx.provider.schedule_calls.load(Ordering::SeqCst), 1);

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.schedule_id.as_deref(), Some("sub_sched_1"));

        // Second delivery with the schedule in place must not create another.
        fx.handler.handle(&succeeded_event()).await.unwrap();
        assert_eq!(fx.provider.schedule_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn schedule_failure_does_not_fail_the_event() {
        let fx = fixture_with(MockProvider::failing_schedule(), RecordingSender::new()).await;

        fx.handler.handle(&succeeded_event()).await.unwrap();

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert!(record.schedule_id.is_none());
        assert_eq!(record.status, SubscriptionStatus::Succeeded);
        // Customer and ops mail still went out.
        assert_eq!(fx.mailer.sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn failure_event_sends_failure_email_only() {
        let fx = fixture().await;

        fx.handler.handle(&failed_event()).await.unwrap();

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::RequiresPaymentMethod);

        let sent = fx.mailer.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Payment failed");
        assert_eq!(fx.provider.schedule_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn brl_payment_gets_portuguese_mail() {
        // The record was created in usd; the language must follow the
        // currency of the payment itself.
        let fx = fixture().await;
        let ev = event(
            "evt_br",
            "payment_intent.payment_failed",
            serde_json::json!({
                "id": "pi_1",
                "status": "requires_payment_method",
                "amount_received": 0,
                "currency": "brl",
                "receipt_email": "user@example.com",
                "customer": "cus_1",
            }),
        );

        fx.handler.handle(&ev).await.unwrap();

        let sent = fx.mailer.sent_messages();
        assert_eq!(sent[0].subject, "Falha no pagamento");
    }

    #[tokio::test]
    async fn unknown_email_is_ignored_silently() {
        let fx = fixture().await;
        let ev = event(
            "evt_x",
            "payment_intent.succeeded",
            payment_intent_object("pi_1", "succeeded", Some("stranger@example.com")),
        );

        let result = fx.handler.handle(&ev).await;
        assert!(matches!(result, Err(WebhookError::Ignored(_))));
        assert!(fx.mailer.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn missing_receipt_email_is_ignored() {
        let fx = fixture().await;
        let ev = event(
            "evt_y",
            "payment_intent.succeeded",
            payment_intent_object("pi_1", "succeeded", None),
        );

        assert!(matches!(
            fx.handler.handle(&ev).await,
            Err(WebhookError::Ignored(_))
        ));
    }

    #[tokio::test]
    async fn unmatched_intent_is_ignored_with_no_mail() {
        let fx = fixture().await;
        let ev = event(
            "evt_z",
            "payment_intent.succeeded",
            payment_intent_object("pi_unknown", "succeeded", Some("user@example.com")),
        );

        assert!(matches!(
            fx.handler.handle(&ev).await,
            Err(WebhookError::Ignored(_))
        ));
        assert!(fx.mailer.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn send_failure_does_not_fail_the_event() {
        let fx = fixture_with(MockProvider::new(), RecordingSender::failing()).await;

        fx.handler.handle(&succeeded_event()).await.unwrap();

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Succeeded);
    }

    #[tokio::test]
    async fn processing_event_updates_status_without_mail() {
        let fx = fixture().await;
        let ev = event(
            "evt_p",
            "payment_intent.processing",
            payment_intent_object("pi_1", "processing", Some("user@example.com")),
        );

        fx.handler.handle(&ev).await.unwrap();

        let record = fx
            .store
            .find_by_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::Processing);
        assert!(fx.mailer.sent_messages().is_empty());
    }
}
