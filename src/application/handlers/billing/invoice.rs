//! Handler for `invoice.*` events.
//!
//! Invoices correlate to records by their subscription id. Renewal payments
//! mark the record active and mail the customer; failed collections mark it
//! past due and ask for a payment method update.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::billing::locale::{format_amount, language_for_currency};
use crate::domain::billing::notification::{
    payment_failed_email, renewal_upcoming_email, subscription_renewed_email, EmailMessage,
};
use crate::domain::billing::{
    EventCategory, InvoiceKind, InvoiceObject, ProviderEvent, SubscriptionPatch,
    SubscriptionStatus, WebhookError,
};
use crate::ports::{NotificationSender, SubscriptionStore, UserDirectory};

use super::process_webhook::WebhookEventHandler;

pub struct InvoiceEventHandler {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn SubscriptionStore>,
    mailer: Arc<dyn NotificationSender>,
}

impl InvoiceEventHandler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn SubscriptionStore>,
        mailer: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            users,
            store,
            mailer,
        }
    }

    async fn send_logged(&self, message: EmailMessage) {
        if let Err(e) = self.mailer.send(&message).await {
            error!(to = %message.to, subject = %message.subject, error = %e,
                "notification send failed");
        }
    }
}

#[async_trait]
impl WebhookEventHandler for InvoiceEventHandler {
    fn handles(&self, category: &EventCategory) -> bool {
        matches!(category, EventCategory::Invoice(_))
    }

    async fn handle(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let kind = match event.category() {
            EventCategory::Invoice(kind) => kind,
            other => {
                return Err(WebhookError::Ignored(format!(
                    "invoice handler got {:?}",
                    other
                )))
            }
        };

        let invoice: InvoiceObject = event
            .invoice()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        // One-off invoices without a subscription are none of our business.
        let subscription_id = match invoice.subscription.as_deref() {
            Some(id) => id,
            None => {
                return Err(WebhookError::Ignored(format!(
                    "invoice {} has no subscription",
                    invoice.id
                )))
            }
        };

        let email = match invoice.customer_email.as_deref() {
            Some(email) => email,
            None => {
                return Err(WebhookError::Ignored(format!(
                    "invoice {} has no customer email",
                    invoice.id
                )))
            }
        };

        if self.users.find_by_email(email).await?.is_none() {
            return Err(WebhookError::Ignored(format!(
                "no user account for customer email on invoice {}",
                invoice.id
            )));
        }

        if self
            .store
            .find_by_subscription_id(subscription_id)
            .await?
            .is_none()
        {
            warn!(subscription_id, invoice_id = %invoice.id,
                "no subscription record for invoice");
            return Err(WebhookError::Ignored(format!(
                "no subscription record for subscription {}",
                subscription_id
            )));
        }

        let language = language_for_currency(&invoice.currency);

        match kind {
            InvoiceKind::Paid | InvoiceKind::PaymentSucceeded => {
                let amount = format_amount(invoice.amount_paid, &invoice.currency);
                let mut patch = SubscriptionPatch::status(SubscriptionStatus::Active);
                if let Some(period_end) = invoice.period_end {
                    patch = patch.with_subscription_end(period_end);
                }
                self.store.update(subscription_id, patch).await?;
                info!(subscription_id, invoice_id = %invoice.id, "renewal invoice settled");
                self.send_logged(subscription_renewed_email(language, email, &amount))
                    .await;
            }
            InvoiceKind::PaymentFailed => {
                let amount = format_amount(invoice.amount_due, &invoice.currency);
                self.store
                    .update(
                        subscription_id,
                        SubscriptionPatch::status(SubscriptionStatus::PastDue),
                    )
                    .await?;
                info!(subscription_id, invoice_id = %invoice.id, "renewal collection failed");
                self.send_logged(payment_failed_email(language, email, &amount))
                    .await;
            }
            InvoiceKind::Upcoming => {
                let amount = format_amount(invoice.amount_due, &invoice.currency);
                self.send_logged(renewal_upcoming_email(language, email, &amount))
                    .await;
            }
            // Draft lifecycle; acknowledged without effects.
            InvoiceKind::Created | InvoiceKind::Finalized => {}
        }

        Ok(())
    }
}
