//! Wire types for Stripe API responses.
//!
//! Only the fields the adapter reads are modeled; everything else in the
//! response is dropped during deserialization.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::billing::{LatestInvoice, PaymentIntentObject};

/// Customer object from `/v1/customers`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created: i64,
}

/// Subscription object from `/v1/subscriptions`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Value,
    pub status: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub currency: String,
    #[serde(default)]
    pub latest_invoice: Option<Value>,
}

impl StripeSubscription {
    /// Customer id, whether the reference is a bare string or expanded.
    pub fn customer_id(&self) -> String {
        match &self.customer {
            Value::String(id) => id.clone(),
            Value::Object(obj) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Typed view of the latest invoice.
    ///
    /// Requests expand `latest_invoice.payment_intent`, but the reference may
    /// still arrive collapsed to an id string, in which case only the id
    /// survives.
    pub fn latest_invoice(&self) -> LatestInvoice {
        match &self.latest_invoice {
            Some(Value::String(id)) => LatestInvoice {
                id: Some(id.clone()),
                payment_intent: None,
            },
            Some(Value::Object(obj)) => {
                let id = obj
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let payment_intent = obj.get("payment_intent").and_then(|pi| match pi {
                    Value::Object(_) => {
                        serde_json::from_value::<PaymentIntentObject>(pi.clone()).ok()
                    }
                    _ => None,
                });
                LatestInvoice { id, payment_intent }
            }
            _ => LatestInvoice::default(),
        }
    }

    /// Payment intent reference that arrived as a bare id string, if any.
    pub fn collapsed_payment_intent_id(&self) -> Option<String> {
        match &self.latest_invoice {
            Some(Value::Object(obj)) => match obj.get("payment_intent") {
                Some(Value::String(id)) => Some(id.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Subscription schedule object from `/v1/subscription_schedules`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSchedule {
    pub id: String,
    pub subscription: Value,
}

impl StripeSchedule {
    pub fn subscription_id(&self) -> String {
        match &self.subscription {
            Value::String(id) => id.clone(),
            Value::Object(obj) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }
}

/// Error envelope Stripe returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
