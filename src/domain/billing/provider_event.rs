//! Provider webhook event envelope and its classification.
//!
//! Events arrive as JSON envelopes with a string `type` discriminator and a
//! semi-structured `data.object`. Classification happens once, at the
//! boundary, into [`EventCategory`]; everything downstream matches on the
//! enum instead of re-inspecting strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw webhook event envelope as delivered by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    /// Provider-issued event id (evt_...). Stable across redeliveries.
    pub id: String,

    /// String discriminator, e.g. "payment_intent.succeeded".
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event creation time, epoch seconds.
    pub created: i64,

    /// Whether the event originated in live mode.
    #[serde(default)]
    pub livemode: bool,

    /// API version the payload was rendered with, informational.
    #[serde(default)]
    pub api_version: Option<String>,

    pub data: ProviderEventData,
}

/// The `data` member of the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventData {
    /// The object the event describes. Shape depends on `event_type`.
    pub object: Value,

    /// For *.updated events, the fields that changed. Unused but kept so
    /// logging can show what moved.
    #[serde(default)]
    pub previous_attributes: Option<Value>,
}

/// Payment-intent kinds this service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentIntentKind {
    Created,
    Processing,
    Succeeded,
    PaymentFailed,
    RequiresAction,
    Canceled,
}

impl PaymentIntentKind {
    /// True for terminal-failure kinds that trigger a failure notification.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::PaymentFailed | Self::Canceled)
    }
}

/// Invoice kinds this service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceKind {
    Created,
    Finalized,
    Paid,
    PaymentSucceeded,
    PaymentFailed,
    Upcoming,
}

impl InvoiceKind {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::PaymentFailed)
    }
}

/// Classified event, produced once at the webhook boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCategory {
    PaymentIntent(PaymentIntentKind),
    Invoice(InvoiceKind),
    /// Any type string outside the two families we handle. Carried for
    /// logging, never routed.
    Unrecognized,
}

impl ProviderEvent {
    /// Classify the event by its type string.
    pub fn category(&self) -> EventCategory {
        match self.event_type.as_str() {
            "payment_intent.created" => EventCategory::PaymentIntent(PaymentIntentKind::Created),
            "payment_intent.processing" => {
                EventCategory::PaymentIntent(PaymentIntentKind::Processing)
            }
            "payment_intent.succeeded" => {
                EventCategory::PaymentIntent(PaymentIntentKind::Succeeded)
            }
            "payment_intent.payment_failed" => {
                EventCategory::PaymentIntent(PaymentIntentKind::PaymentFailed)
            }
            "payment_intent.requires_action" => {
                EventCategory::PaymentIntent(PaymentIntentKind::RequiresAction)
            }
            "payment_intent.canceled" => EventCategory::PaymentIntent(PaymentIntentKind::Canceled),
            "invoice.created" => EventCategory::Invoice(InvoiceKind::Created),
            "invoice.finalized" => EventCategory::Invoice(InvoiceKind::Finalized),
            "invoice.paid" => EventCategory::Invoice(InvoiceKind::Paid),
            "invoice.payment_succeeded" => EventCategory::Invoice(InvoiceKind::PaymentSucceeded),
            "invoice.payment_failed" => EventCategory::Invoice(InvoiceKind::PaymentFailed),
            "invoice.upcoming" => EventCategory::Invoice(InvoiceKind::Upcoming),
            _ => EventCategory::Unrecognized,
        }
    }

    /// Deserialize `data.object` as a payment intent.
    pub fn payment_intent(&self) -> Result<PaymentIntentObject, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    /// Deserialize `data.object` as an invoice.
    pub fn invoice(&self) -> Result<InvoiceObject, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// The fields of a provider payment intent this service reads. Everything
/// else in the object is dropped at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentObject {
    /// Provider payment intent id (pi_...).
    pub id: String,

    /// Intent status string, written through to the record verbatim.
    pub status: String,

    /// Amount captured so far, in the currency's minor unit.
    #[serde(default)]
    pub amount_received: i64,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Email the provider will send its receipt to; our user lookup key.
    #[serde(default)]
    pub receipt_email: Option<String>,

    /// Provider customer id, when attached.
    #[serde(default, deserialize_with = "expandable_id", skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

/// The fields of a provider invoice this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceObject {
    /// Provider invoice id (in_...).
    pub id: String,

    /// Subscription the invoice bills; our correlation key.
    #[serde(default, deserialize_with = "expandable_id")]
    pub subscription: Option<String>,

    /// Provider customer id.
    #[serde(default, deserialize_with = "expandable_id")]
    pub customer: Option<String>,

    /// Email of the billed customer; our user lookup key.
    #[serde(default)]
    pub customer_email: Option<String>,

    /// Amount already paid, minor unit.
    #[serde(default)]
    pub amount_paid: i64,

    /// Amount still owed, minor unit.
    #[serde(default)]
    pub amount_due: i64,

    /// End of the billing period the invoice covers, epoch seconds.
    #[serde(default)]
    pub period_end: Option<i64>,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Invoice status string ("draft", "open", "paid", ...).
    #[serde(default)]
    pub status: Option<String>,
}

/// Provider references may arrive as a bare id string or as an expanded
/// object carrying an `id`. Accept both.
fn expandable_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) => Some(id),
        Some(Value::Object(obj)) => obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    })
}
