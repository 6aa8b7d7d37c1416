//! Idempotent webhook event processing.
//!
//! Coordinates between the processed-event audit trail and the per-family
//! event handlers. Sequential redeliveries of an event id are skipped by the
//! audit lookup before dispatch; when two deliveries of the same id race,
//! both may dispatch, but the first save wins (the audit table has a primary
//! key on event id) and the loser reports `AlreadyProcessed`. The audit row
//! is exactly-once; handler effects are at-least-once. Handler writes are
//! last-write-wins status patches, so a racing duplicate costs at worst a
//! repeated email.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::billing::{EventCategory, ProviderEvent, WebhookError};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookResult};

/// Handler for one family of provider events.
///
/// Implementations are stateless; they receive the already-classified event
/// and perform the domain effects.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    /// Whether this handler covers the given category.
    fn handles(&self, category: &EventCategory) -> bool;

    /// Handle the event.
    ///
    /// `Err(WebhookError::Ignored(_))` means acknowledged but skipped; other
    /// errors are genuine failures.
    async fn handle(&self, event: &ProviderEvent) -> Result<(), WebhookError>;
}

/// Routes classified events to the handler covering their category.
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn WebhookEventHandler>>,
}

impl EventDispatcher {
    pub fn new(handlers: Vec<Arc<dyn WebhookEventHandler>>) -> Self {
        Self { handlers }
    }

    async fn dispatch(&self, event: &ProviderEvent) -> Result<(), WebhookError> {
        let category = event.category();
        match self.handlers.iter().find(|h| h.handles(&category)) {
            Some(handler) => handler.handle(event).await,
            None => Err(WebhookError::Ignored(format!(
                "no handler for event type {}",
                event.event_type
            ))),
        }
    }
}

/// Deduplicates webhook deliveries by provider event id.
pub struct IdempotentWebhookProcessor {
    repository: Arc<dyn WebhookEventRepository>,
    dispatcher: EventDispatcher,
}

impl IdempotentWebhookProcessor {
    pub fn new(repository: Arc<dyn WebhookEventRepository>, dispatcher: EventDispatcher) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Process one event: skip if seen, dispatch otherwise, record the
    /// outcome.
    pub async fn process(&self, event: ProviderEvent) -> Result<WebhookResult, WebhookError> {
        if self.repository.find_by_event_id(&event.id).await?.is_some() {
            info!(event_id = %event.id, "webhook event already processed, skipping");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        let result = self.dispatcher.dispatch(&event).await;

        let payload = serde_json::json!({
            "id": event.id,
            "type": event.event_type,
            "created": event.created,
            "livemode": event.livemode,
            "data": { "object": event.data.object },
        });

        let record = match &result {
            Ok(()) => WebhookEventRecord::success(&event.id, &event.event_type, payload),
            Err(WebhookError::Ignored(reason)) => {
                info!(event_id = %event.id, event_type = %event.event_type, %reason,
                    "webhook event ignored");
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload)
            }
            Err(e) => {
                warn!(event_id = %event.id, event_type = %event.event_type, error = %e,
                    "webhook event handling failed");
                WebhookEventRecord::failed(&event.id, &event.event_type, e.to_string(), payload)
            }
        };

        match self.repository.save(record).await? {
            SaveResult::Inserted => match result {
                Ok(()) => Ok(WebhookResult::Processed),
                // Ignored events count as processed for idempotency purposes
                Err(WebhookError::Ignored(_)) => Ok(WebhookResult::Processed),
                Err(e) => Err(e),
            },
            SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
        }
    }
}
