//! CreateSubscriptionHandler - establishes a subscription on the provider
//! and persists the local record.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{
    LatestInvoice, PlanCatalog, PlanType, Recurrency, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, PaymentProvider, SubscriptionStore,
    UserDirectory,
};

/// Command to create a subscription for an existing user account.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub email: String,
    pub plan: PlanType,
    pub recurrency: Recurrency,
}

pub struct CreateSubscriptionHandler {
    users: Arc<dyn UserDirectory>,
    provider: Arc<dyn PaymentProvider>,
    store: Arc<dyn SubscriptionStore>,
    catalog: PlanCatalog,
}

impl CreateSubscriptionHandler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn SubscriptionStore>,
        catalog: PlanCatalog,
    ) -> Self {
        Self {
            users,
            provider,
            store,
            catalog,
        }
    }

    /// Create the provider customer and subscription, then persist a record.
    ///
    /// The record starts in whatever status the provider reports (usually
    /// `incomplete` until the first payment intent settles); webhook events
    /// move it forward from there.
    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<SubscriptionRecord, DomainError> {
        let user = self
            .users
            .find_by_email(&cmd.email)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::UserNotFound,
                    format!("no user account for {}", cmd.email),
                )
            })?;

        let price_id = self
            .catalog
            .price_id(cmd.plan, cmd.recurrency)
            .ok_or_else(|| {
                DomainError::validation(
                    "plan",
                    format!(
                        "no price configured for {} {}",
                        cmd.plan.as_str(),
                        cmd.recurrency.as_str()
                    ),
                )
            })?
            .to_string();

        let customer = self
            .provider
            .create_customer(CreateCustomerRequest {
                user_id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            })
            .await?;

        let subscription = self
            .provider
            .create_subscription(CreateSubscriptionRequest {
                customer_id: customer.id.clone(),
                price_id: price_id.clone(),
            })
            .await?;

        let customer_json = serde_json::to_value(&customer)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

        let record = SubscriptionRecord {
            subscription_id: subscription.id.clone(),
            schedule_id: None,
            user_id: user.id,
            subscription_start: subscription.current_period_start,
            subscription_end: subscription.current_period_end,
            currency: subscription.currency.clone(),
            price_id,
            recurrency: cmd.recurrency,
            customer: customer_json,
            latest_invoice: subscription.latest_invoice.clone(),
            status: SubscriptionStatus::parse(&subscription.status),
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        };

        self.store.create(record.clone()).await?;

        info!(subscription_id = %record.subscription_id, user_id = %record.user_id,
            plan = cmd.plan.as_str(), recurrency = cmd.recurrency.as_str(),
            "subscription created");

        Ok(record)
    }
}
