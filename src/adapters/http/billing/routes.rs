//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, create_subscription, handle_stripe_webhook, health,
    list_subscriptions, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
/// - `POST /subscriptions` - Create a subscription for a user
/// - `GET /subscriptions` - List a user's subscriptions
/// - `POST /subscriptions/cancel` - Cancel a subscription
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/cancel", post(cancel_subscription))
}

/// Create the provider webhook router.
///
/// Separate from the billing routes because webhook deliveries carry no
/// user credentials; they are authenticated by signature instead.
///
/// # Routes
/// - `POST /stripe` - Receive Stripe webhook deliveries
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing module router.
///
/// Mounts the API under `/billing`, the webhook endpoint under `/webhooks`,
/// and a `/health` probe; suitable for nesting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::billing::{LatestInvoice, PaymentIntentObject, WebhookVerifier};
    use crate::domain::billing::plan::test_catalog;
    use crate::domain::foundation::UserId;
    use crate::ports::notification_sender::test_support::RecordingSender;
    use crate::ports::subscription_store::test_support::InMemorySubscriptionStore;
    use crate::ports::user_directory::test_support::InMemoryUserDirectory;
    use crate::ports::webhook_event_repository::test_support::InMemoryWebhookEventRepository;
    use crate::ports::{
        CreateCustomerRequest, CreateSubscriptionRequest, PaymentError, PaymentProvider,
        ProviderCustomer, ProviderSchedule, ProviderSubscription,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct MockPaymentProvider;

    #[async_trait]
    impl PaymentProvider for MockPaymentProvider {
        async fn create_customer(
            &self,
            request: CreateCustomerRequest,
        ) -> Result<ProviderCustomer, PaymentError> {
            Ok(ProviderCustomer {
                id: "cus_test123".to_string(),
                email: request.email,
                name: request.name,
                created: 1_704_067_200,
            })
        }

        async fn create_subscription(
            &self,
            request: CreateSubscriptionRequest,
        ) -> Result<ProviderSubscription, PaymentError> {
            Ok(ProviderSubscription {
                id: "sub_test123".to_string(),
                customer_id: request.customer_id,
                status: "incomplete".to_string(),
                current_period_start: 1_704_067_200,
                current_period_end: 1_706_745_600,
                currency: "usd".to_string(),
                latest_invoice: LatestInvoice {
                    id: Some("in_test123".to_string()),
                    payment_intent: Some(PaymentIntentObject {
                        id: "pi_test123".to_string(),
                        status: "requires_payment_method".to_string(),
                        amount_received: 0,
                        currency: "usd".to_string(),
                        receipt_email: None,
                        customer: Some("cus_test123".to_string()),
                    }),
                },
            })
        }

        async fn cancel_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSubscription, PaymentError> {
            Ok(ProviderSubscription {
                id: subscription_id.to_string(),
                customer_id: "cus_test123".to_string(),
                status: "canceled".to_string(),
                current_period_start: 1_704_067_200,
                current_period_end: 1_706_745_600,
                currency: "usd".to_string(),
                latest_invoice: LatestInvoice::default(),
            })
        }

        async fn create_subscription_schedule(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSchedule, PaymentError> {
            Ok(ProviderSchedule {
                id: "sub_sched_test123".to_string(),
                subscription_id: subscription_id.to_string(),
            })
        }

        async fn get_payment_intent(
            &self,
            payment_intent_id: &str,
        ) -> Result<PaymentIntentObject, PaymentError> {
            Ok(PaymentIntentObject {
                id: payment_intent_id.to_string(),
                status: "requires_payment_method".to_string(),
                amount_received: 0,
                currency: "usd".to_string(),
                receipt_email: None,
                customer: Some("cus_test123".to_string()),
            })
        }
    }

    fn test_state() -> BillingAppState {
        BillingAppState {
            users: Arc::new(
                InMemoryUserDirectory::new().with_user("user@example.com", UserId::new()),
            ),
            store: Arc::new(InMemorySubscriptionStore::new()),
            provider: Arc::new(MockPaymentProvider),
            mailer: Arc::new(RecordingSender::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
            verifier: Arc::new(WebhookVerifier::new("whsec_test")),
            catalog: test_catalog(),
            ops_email: "payments@subhub.app".to_string(),
        }
    }

    #[tokio::test]
    async fn create_subscription_endpoint_persists_and_returns_created() {
        let app = billing_routes().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/subscriptions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"user@example.com","plan":"pro","recurrency":"month"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn create_subscription_rejects_unknown_plan() {
        let app = billing_routes().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/subscriptions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"user@example.com","plan":"platinum","recurrency":"month"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_endpoint_rejects_forged_signature() {
        let app = webhook_routes().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stripe")
                    .header("Stripe-Signature", "t=1704067200,v1=deadbeef")
                    .body(Body::from(r#"{"id":"evt_1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_endpoint_rejects_missing_signature_header() {
        let app = webhook_routes().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stripe")
                    .body(Body::from(r#"{"id":"evt_1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = billing_router().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
