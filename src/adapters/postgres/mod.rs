//! PostgreSQL adapters for the persistence ports.

pub mod subscription_store;
pub mod user_directory;
pub mod webhook_event_repository;

pub use subscription_store::PostgresSubscriptionStore;
pub use user_directory::PostgresUserDirectory;
pub use webhook_event_repository::PostgresWebhookEventRepository;
