//! Subscription record aggregate and its value objects.
//!
//! A subscription record mirrors one provider subscription locally. It is
//! created when the subscription is established on the provider, mutated on
//! webhook events or explicit cancel calls, and never hard-deleted:
//! cancellation is a status transition.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::provider_event::PaymentIntentObject;

/// Subscription status as tracked locally.
///
/// Covers provider subscription states plus the payment-intent statuses that
/// webhook reconciliation writes through verbatim. Transitions are driven
/// only by provider events or explicit cancel calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    // Payment-intent statuses written through by the reconciliation handlers
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresAction,
    /// Any provider status we do not recognize.
    Unknown,
}

impl SubscriptionStatus {
    /// Parse a provider status string.
    pub fn parse(s: &str) -> Self {
        match s {
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_action" => Self::RequiresAction,
            _ => Self::Unknown,
        }
    }

    /// Provider-compatible string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresAction => "requires_action",
            Self::Unknown => "unknown",
        }
    }

    /// True once the subscription has been canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Billing cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrency {
    Month,
    Year,
}

impl Recurrency {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Most recent invoice associated with the subscription.
///
/// Semi-structured on the wire; only the nested payment intent is load-bearing
/// here, as the correlation key joining `payment_intent.*` events to records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestInvoice {
    /// Provider invoice id (in_...), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Payment intent most recently associated with the subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<PaymentIntentObject>,
}

/// One billing subscription instance, keyed by the provider subscription id.
///
/// At most one record exists per `subscription_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Provider-issued subscription id (sub_...), unique.
    pub subscription_id: String,

    /// Provider subscription schedule id, once one has been created.
    pub schedule_id: Option<String>,

    /// Owning user (referenced, not embedded).
    pub user_id: UserId,

    /// Billing period start, epoch seconds.
    pub subscription_start: i64,

    /// Billing period end, epoch seconds.
    pub subscription_end: i64,

    /// ISO currency code, lowercase (provider convention).
    pub currency: String,

    /// Provider price id the subscription was created with.
    pub price_id: String,

    /// Billing cadence.
    pub recurrency: Recurrency,

    /// Provider customer reference, semi-structured.
    pub customer: serde_json::Value,

    /// Latest invoice, carrying the payment-intent correlation key.
    pub latest_invoice: LatestInvoice,

    /// Current status.
    pub status: SubscriptionStatus,

    /// Record bookkeeping.
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// The payment-intent correlation key, when present.
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.latest_invoice
            .payment_intent
            .as_ref()
            .map(|pi| pi.id.as_str())
    }

    /// Provider customer id, when the semi-structured customer reference
    /// carries one (either a bare string or an object with an `id`).
    pub fn customer_id(&self) -> Option<&str> {
        match &self.customer {
            serde_json::Value::String(id) => Some(id.as_str()),
            serde_json::Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

/// Partial update applied to a stored record.
///
/// Every field is independently last-write-wins; concurrent webhook
/// deliveries for the same subscription id may race and the last write
/// determines final state.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub latest_payment_intent: Option<PaymentIntentObject>,
    pub schedule_id: Option<String>,
    pub subscription_end: Option<i64>,
}

impl SubscriptionPatch {
    pub fn status(status: SubscriptionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_payment_intent(mut self, intent: PaymentIntentObject) -> Self {
        self.latest_payment_intent = Some(intent);
        self
    }

    pub fn with_schedule_id(mut self, schedule_id: impl Into<String>) -> Self {
        self.schedule_id = Some(schedule_id.into());
        self
    }

    pub fn with_subscription_end(mut self, end: i64) -> Self {
        self.subscription_end = Some(end);
        self
    }

    /// Apply the patch to a record in place, bumping `updated_at`.
    pub fn apply(self, record: &mut SubscriptionRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(intent) = self.latest_payment_intent {
            record.latest_invoice.payment_intent = Some(intent);
        }
        if let Some(schedule_id) = self.schedule_id {
            record.schedule_id = Some(schedule_id);
        }
        if let Some(end) = self.subscription_end {
            record.subscription_end = end;
        }
        record.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
pub(crate) fn test_record(subscription_id: &str, payment_intent_id: &str) -> SubscriptionRecord {
    use serde_json::json;

    SubscriptionRecord {
        subscription_id: subscription_id.to_string(),
        schedule_id: None,
        user_id: UserId::new(),
        subscription_start: 1_704_067_200,
        subscription_end: 1_706_745_600,
        currency: "usd".to_string(),
        price_id: "price_pro_m".to_string(),
        recurrency: Recurrency::Month,
        customer: json!("cus_1"),
        latest_invoice: LatestInvoice {
            id: Some("in_1".to_string()),
            payment_intent: Some(PaymentIntentObject {
                id: payment_intent_id.to_string(),
                status: "requires_payment_method".to_string(),
                amount_received: 0,
                currency: "usd".to_string(),
                receipt_email: None,
                customer: Some("cus_1".to_string()),
            }),
        },
        status: SubscriptionStatus::Incomplete,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    }
}
