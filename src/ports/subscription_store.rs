//! SubscriptionStore port - persistence for subscription records.

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionPatch, SubscriptionRecord};
use crate::domain::foundation::{DomainError, UserId};

/// Port for storing and querying subscription records.
///
/// Records are keyed by provider subscription id. Updates are
/// last-write-wins; the store does no version checking.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist a new record.
    ///
    /// Fails with a database error if the subscription id already exists.
    async fn create(&self, record: SubscriptionRecord) -> Result<(), DomainError>;

    /// All records belonging to a user, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Look up one record by provider subscription id.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Look up the record whose latest invoice carries the given payment
    /// intent id. This is how `payment_intent.*` events find their record.
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Apply a partial update to the record with the given subscription id.
    ///
    /// Returns the updated record, or `None` when no record exists.
    async fn update(
        &self,
        subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Mark a record canceled.
    ///
    /// Returns the record afterward, or `None` when no record exists.
    /// Canceling an already-canceled record is a no-op that still returns it.
    async fn cancel(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;
}
