//! Payment provider port.
//!
//! Contract for the payment gateway the service bills through. Implementations
//! own the HTTP plumbing; callers see typed requests and responses only.

use crate::domain::billing::{LatestInvoice, PaymentIntentObject};
use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer in the payment system.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProviderCustomer, PaymentError>;

    /// Create a subscription for an existing customer.
    ///
    /// The returned subscription carries the provider's initial payment
    /// intent inside `latest_invoice`.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Cancel a subscription immediately on the provider side.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Create a subscription schedule from an existing subscription so its
    /// phases can be managed later.
    async fn create_subscription_schedule(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSchedule, PaymentError>;

    /// Retrieve a payment intent by id.
    async fn get_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntentObject, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user id, stored as provider metadata.
    pub user_id: UserId,

    /// Customer email address.
    pub email: String,

    /// Customer name, when known.
    pub name: Option<String>,
}

/// Customer as known to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCustomer {
    /// Provider customer id (cus_...).
    pub id: String,

    pub email: String,

    pub name: Option<String>,

    /// Provider creation time, epoch seconds.
    pub created: i64,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Provider customer id.
    pub customer_id: String,

    /// Provider price id to subscribe to.
    pub price_id: String,
}

/// Subscription as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Provider subscription id (sub_...).
    pub id: String,

    /// Provider customer id.
    pub customer_id: String,

    /// Provider status string, parsed downstream.
    pub status: String,

    /// Billing period bounds, epoch seconds.
    pub current_period_start: i64,
    pub current_period_end: i64,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Initial invoice with its payment intent, when expanded.
    pub latest_invoice: LatestInvoice,
}

/// Subscription schedule as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSchedule {
    /// Provider schedule id (sub_sched_...).
    pub id: String,

    /// Subscription the schedule manages.
    pub subscription_id: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code, when it returned one.
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::CardDeclined => ErrorCode::PaymentRequired,
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined at subscription creation.
    CardDeclined,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());

        assert!(!PaymentErrorCode::CardDeclined.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::new(PaymentErrorCode::CardDeclined, "Your card was declined");
        assert!(err.to_string().contains("card_declined"));
        assert!(err.to_string().contains("Your card was declined"));
    }

    #[test]
    fn payment_error_converts_to_domain_error() {
        use crate::domain::foundation::ErrorCode;

        let err: DomainError =
            PaymentError::new(PaymentErrorCode::NotFound, "no such subscription").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: DomainError = PaymentError::network("timeout").into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }
}
