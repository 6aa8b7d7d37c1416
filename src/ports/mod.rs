//! Ports: trait contracts between the application core and its adapters.

pub mod notification_sender;
pub mod payment_provider;
pub mod subscription_store;
pub mod user_directory;
pub mod webhook_event_repository;

pub use notification_sender::{NotificationError, NotificationSender};
pub use payment_provider::{
    CreateCustomerRequest, CreateSubscriptionRequest, PaymentError, PaymentErrorCode,
    PaymentProvider, ProviderCustomer, ProviderSchedule, ProviderSubscription,
};
pub use subscription_store::SubscriptionStore;
pub use user_directory::{UserAccount, UserDirectory};
pub use webhook_event_repository::{
    ProcessingOutcome, SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult,
};
