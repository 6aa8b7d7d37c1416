//! Billing domain: subscription records, provider events, webhook
//! verification, and notification templates.

pub mod locale;
pub mod notification;
pub mod plan;
pub mod provider_event;
pub mod subscription;
pub mod webhook_errors;
pub mod webhook_verifier;

pub use plan::{PlanCatalog, PlanEntry, PlanType};
pub use provider_event::{
    EventCategory, InvoiceKind, InvoiceObject, PaymentIntentKind, PaymentIntentObject,
    ProviderEvent,
};
pub use subscription::{
    LatestInvoice, Recurrency, SubscriptionPatch, SubscriptionRecord, SubscriptionStatus,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};
