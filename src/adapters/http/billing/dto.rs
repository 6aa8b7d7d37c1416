//! Request and response DTOs for the billing HTTP API.

use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionRecord;

/// POST /api/billing/subscriptions request body.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub email: String,
    pub plan: String,
    pub recurrency: String,
}

/// POST /api/billing/subscriptions/cancel request body.
#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub subscription_id: String,
}

/// GET /api/billing/subscriptions query string.
#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    pub email: String,
}

/// Subscription view returned by the API.
///
/// Raw provider payloads (`customer`, `latest_invoice`) are not exposed;
/// clients only get the fields they act on.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    pub user_id: String,
    pub status: String,
    pub price_id: String,
    pub recurrency: String,
    pub currency: String,
    pub subscription_start: i64,
    pub subscription_end: i64,
    pub schedule_id: Option<String>,
}

impl From<SubscriptionRecord> for SubscriptionResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            subscription_id: record.subscription_id,
            user_id: record.user_id.to_string(),
            status: record.status.as_str().to_string(),
            price_id: record.price_id,
            recurrency: record.recurrency.as_str().to_string(),
            currency: record.currency,
            subscription_start: record.subscription_start,
            subscription_end: record.subscription_end,
            schedule_id: record.schedule_id,
        }
    }
}

/// Envelope for cancellation responses.
#[derive(Debug, Serialize)]
pub struct CancelSubscriptionResponse {
    pub subscription: SubscriptionResponse,
    /// False when the subscription was already canceled.
    pub canceled_now: bool,
}

/// Standard error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
