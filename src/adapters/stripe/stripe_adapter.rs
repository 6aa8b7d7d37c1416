//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API.
//! Requests are form-encoded with the secret key as HTTP basic auth, per
//! Stripe convention. The API key never appears in logs or Debug output.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::billing::PaymentIntentObject;
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, PaymentError, PaymentErrorCode,
    PaymentProvider, ProviderCustomer, ProviderSchedule, ProviderSubscription,
};

use super::api_types::{StripeCustomer, StripeErrorResponse, StripeSchedule, StripeSubscription};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }
}

/// Stripe adapter implementing the `PaymentProvider` port.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        debug!(%path, "stripe api request");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        debug!(%path, "stripe api get");

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), None::<&str>)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        debug!(%path, "stripe api delete");

        let response = self
            .http_client
            .delete(&url)
            .basic_auth(self.config.api_key.expose_secret(), None::<&str>)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                PaymentError::provider(format!("unexpected stripe response shape: {}", e))
            });
        }

        let (message, provider_code) = match serde_json::from_str::<StripeErrorResponse>(&body) {
            Ok(err) => (
                err.error
                    .message
                    .unwrap_or_else(|| format!("stripe error ({})", status)),
                err.error.code,
            ),
            Err(_) => (format!("stripe error ({})", status), None),
        };

        let code = match status.as_u16() {
            401 | 403 => PaymentErrorCode::AuthenticationError,
            404 => PaymentErrorCode::NotFound,
            429 => PaymentErrorCode::RateLimitExceeded,
            402 => PaymentErrorCode::CardDeclined,
            _ => PaymentErrorCode::ProviderError,
        };

        let mut err = PaymentError::new(code, message);
        if let Some(provider_code) = provider_code {
            err = err.with_provider_code(provider_code);
        }
        Err(err)
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProviderCustomer, PaymentError> {
        let mut form = vec![
            ("email".to_string(), request.email.clone()),
            (
                "metadata[user_id]".to_string(),
                request.user_id.to_string(),
            ),
        ];
        if let Some(name) = &request.name {
            form.push(("name".to_string(), name.clone()));
        }

        let customer: StripeCustomer = self.post_form("/v1/customers", &form).await?;

        Ok(ProviderCustomer {
            id: customer.id,
            email: customer.email.unwrap_or(request.email),
            name: customer.name,
            created: customer.created,
        })
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<ProviderSubscription, PaymentError> {
        // default_incomplete keeps the subscription pending until the first
        // payment intent is confirmed by the customer.
        let form = vec![
            ("customer".to_string(), request.customer_id),
            ("items[0][price]".to_string(), request.price_id),
            (
                "payment_behavior".to_string(),
                "default_incomplete".to_string(),
            ),
            (
                "expand[]".to_string(),
                "latest_invoice.payment_intent".to_string(),
            ),
        ];

        let subscription: StripeSubscription = self.post_form("/v1/subscriptions", &form).await?;

        // The expansion is best-effort on Stripe's side; when the payment
        // intent still comes back as a bare reference, fetch it so the record
        // always starts with its correlation key.
        let mut latest_invoice = subscription.latest_invoice();
        if latest_invoice.payment_intent.is_none() {
            if let Some(intent_id) = subscription.collapsed_payment_intent_id() {
                match self.get_payment_intent(&intent_id).await {
                    Ok(intent) => latest_invoice.payment_intent = Some(intent),
                    Err(e) => {
                        warn!(subscription_id = %subscription.id, %intent_id, error = %e,
                            "payment intent fetch after create failed");
                    }
                }
            }
        }

        Ok(ProviderSubscription {
            customer_id: subscription.customer_id(),
            status: subscription.status.clone(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            currency: subscription.currency.clone(),
            latest_invoice,
            id: subscription.id,
        })
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, PaymentError> {
        let subscription: StripeSubscription = self
            .delete(&format!("/v1/subscriptions/{}", subscription_id))
            .await?;

        Ok(ProviderSubscription {
            customer_id: subscription.customer_id(),
            status: subscription.status.clone(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            currency: subscription.currency.clone(),
            latest_invoice: subscription.latest_invoice(),
            id: subscription.id,
        })
    }

    async fn create_subscription_schedule(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSchedule, PaymentError> {
        let form = vec![(
            "from_subscription".to_string(),
            subscription_id.to_string(),
        )];

        let schedule: StripeSchedule = self
            .post_form("/v1/subscription_schedules", &form)
            .await?;

        Ok(ProviderSchedule {
            subscription_id: schedule.subscription_id(),
            id: schedule.id,
        })
    }

    async fn get_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntentObject, PaymentError> {
        self.get(&format!("/v1/payment_intents/{}", payment_intent_id))
            .await
    }
}
