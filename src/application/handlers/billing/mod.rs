//! Billing command handlers and webhook processing.

pub mod cancel_subscription;
pub mod create_subscription;
pub mod invoice;
pub mod payment_intent;
pub mod process_webhook;

pub use cancel_subscription::{CancelOutcome, CancelSubscriptionHandler};
pub use create_subscription::{CreateSubscriptionCommand, CreateSubscriptionHandler};
pub use invoice::InvoiceEventHandler;
pub use payment_intent::PaymentIntentEventHandler;
pub use process_webhook::{EventDispatcher, IdempotentWebhookProcessor, WebhookEventHandler};
