//! Axum handlers for the billing API.
//!
//! Handlers stay thin: decode the request, build the command handler from
//! application state, map errors to HTTP responses.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use crate::application::handlers::billing::{
    CancelOutcome, CancelSubscriptionHandler, CreateSubscriptionCommand,
    CreateSubscriptionHandler, EventDispatcher, IdempotentWebhookProcessor,
    InvoiceEventHandler, PaymentIntentEventHandler, WebhookEventHandler,
};
use crate::domain::billing::{PlanCatalog, PlanType, Recurrency, WebhookError, WebhookVerifier};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{
    NotificationSender, PaymentProvider, SubscriptionStore, UserDirectory,
    WebhookEventRepository,
};

use super::dto::{
    CancelSubscriptionRequest, CancelSubscriptionResponse, CreateSubscriptionRequest,
    ErrorResponse, ListSubscriptionsQuery, SubscriptionResponse,
};

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub users: Arc<dyn UserDirectory>,
    pub store: Arc<dyn SubscriptionStore>,
    pub provider: Arc<dyn PaymentProvider>,
    pub mailer: Arc<dyn NotificationSender>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub verifier: Arc<WebhookVerifier>,
    pub catalog: PlanCatalog,
    pub ops_email: String,
}

impl BillingAppState {
    pub fn create_subscription_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            self.users.clone(),
            self.provider.clone(),
            self.store.clone(),
            self.catalog.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.store.clone(), self.provider.clone())
    }

    pub fn webhook_processor(&self) -> IdempotentWebhookProcessor {
        let handlers: Vec<Arc<dyn WebhookEventHandler>> = vec![
            Arc::new(PaymentIntentEventHandler::new(
                self.users.clone(),
                self.store.clone(),
                self.provider.clone(),
                self.mailer.clone(),
                self.catalog.clone(),
                self.ops_email.clone(),
            )),
            Arc::new(InvoiceEventHandler::new(
                self.users.clone(),
                self.store.clone(),
                self.mailer.clone(),
            )),
        ];
        IdempotentWebhookProcessor::new(
            self.webhook_events.clone(),
            EventDispatcher::new(handlers),
        )
    }
}

/// POST /api/billing/subscriptions - Create a subscription
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan = PlanType::parse(&request.plan)
        .ok_or_else(|| DomainError::validation("plan", format!("unknown plan {}", request.plan)))?;
    let recurrency = Recurrency::parse(&request.recurrency).ok_or_else(|| {
        DomainError::validation(
            "recurrency",
            format!("unknown recurrency {}", request.recurrency),
        )
    })?;

    let handler = state.create_subscription_handler();
    let record = handler
        .handle(CreateSubscriptionCommand {
            email: request.email,
            plan,
            recurrency,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(record))))
}

/// GET /api/billing/subscriptions?email=... - List a user's subscriptions
pub async fn list_subscriptions(
    State(state): State<BillingAppState>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<impl IntoResponse, BillingApiError> {
    let user = state
        .users
        .find_by_email(&query.email)
        .await?
        .ok_or_else(|| {
            DomainError::new(
                ErrorCode::UserNotFound,
                format!("no user account for {}", query.email),
            )
        })?;

    let records = state.store.find_by_user(user.id).await?;
    let views: Vec<SubscriptionResponse> =
        records.into_iter().map(SubscriptionResponse::from).collect();

    Ok(Json(views))
}

/// POST /api/billing/subscriptions/cancel - Cancel a subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_subscription_handler();

    match handler.handle(&request.subscription_id).await? {
        CancelOutcome::Canceled(record) => Ok(Json(CancelSubscriptionResponse {
            subscription: SubscriptionResponse::from(record),
            canceled_now: true,
        })),
        CancelOutcome::AlreadyCanceled(record) => Ok(Json(CancelSubscriptionResponse {
            subscription: SubscriptionResponse::from(record),
            canceled_now: false,
        })),
        CancelOutcome::NotFound => Err(DomainError::new(
            ErrorCode::SubscriptionNotFound,
            format!("no subscription {}", request.subscription_id),
        )
        .into()),
    }
}

/// POST /api/webhooks/stripe - Receive provider webhook deliveries
///
/// The signature is checked before anything else; processing then happens
/// off the request path so the provider gets its 200 within its delivery
/// timeout even when downstream calls are slow. Failures are recorded in
/// the audit table, not surfaced to the sender.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            BillingApiError::Webhook(WebhookError::InvalidSignature(
                "missing Stripe-Signature header".to_string(),
            ))
        })?;

    let event = state.verifier.verify_and_parse(&body, signature)?;

    let processor = state.webhook_processor();
    tokio::spawn(async move {
        let event_id = event.id.clone();
        if let Err(e) = processor.process(event).await {
            error!(event_id = %event_id, error = %e, "webhook processing failed");
        }
    });

    Ok(StatusCode::OK)
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain and webhook errors to HTTP responses.
pub enum BillingApiError {
    Domain(DomainError),
    Webhook(WebhookError),
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<WebhookError> for BillingApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            Self::Domain(err) => {
                let status = match err.code {
                    ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                        StatusCode::BAD_REQUEST
                    }
                    ErrorCode::SubscriptionNotFound
                    | ErrorCode::UserNotFound
                    | ErrorCode::NotFound => StatusCode::NOT_FOUND,
                    ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
                    ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
                    ErrorCode::ExternalServiceError => StatusCode::BAD_GATEWAY,
                    ErrorCode::DatabaseError | ErrorCode::InternalError => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code.to_string(), err.message)
            }
            Self::Webhook(err) if err.is_rejection() => (
                StatusCode::UNAUTHORIZED,
                "INVALID_WEBHOOK_SIGNATURE".to_string(),
                err.to_string(),
            ),
            Self::Webhook(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                err.to_string(),
            ),
        };

        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    fn status_of(err: BillingApiError) -> StatusCode {
        let response: Response = err.into_response();
        response.status()
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(
            status_of(DomainError::validation("plan", "bad").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::new(ErrorCode::UserNotFound, "nope").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::new(ErrorCode::SubscriptionNotFound, "nope").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::new(ErrorCode::PaymentRequired, "declined").into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(DomainError::new(ErrorCode::ExternalServiceError, "down").into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DomainError::database("oops").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn webhook_rejections_are_unauthorized() {
        let err = WebhookError::InvalidSignature("mismatch".to_string());
        assert_eq!(status_of(err.into()), StatusCode::UNAUTHORIZED);

        let err = WebhookError::LivemodeMismatch {
            expected: true,
            actual: false,
        };
        assert_eq!(status_of(err.into()), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn webhook_internal_errors_are_500() {
        let err = WebhookError::Database("connection refused".to_string());
        assert_eq!(status_of(err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
