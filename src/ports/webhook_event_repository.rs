//! WebhookEventRepository port - audit trail of processed webhook deliveries.
//!
//! The provider redelivers events on timeouts and non-2xx responses, so the
//! same event id can arrive more than once. This port is the dedup point:
//! the first delivery inserts a record, later ones see it and skip. Records
//! keep the payload and outcome so a delivery can be inspected after the fact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// Outcome of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Event was handled and produced effects.
    Success,
    /// Event was deliberately skipped (unrecognized type, no matching user).
    Ignored,
    /// Event handling raised an error.
    Failed,
}

impl ProcessingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "ignored" => Some(Self::Ignored),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Provider event id (evt_...). Primary key.
    pub event_id: String,

    /// Provider event type string (e.g. "payment_intent.succeeded").
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: DateTime<Utc>,

    /// Outcome of processing.
    pub outcome: ProcessingOutcome,

    /// Skip reason or error message, for ignored/failed outcomes.
    pub detail: Option<String>,

    /// Original event payload, kept for inspection.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            outcome: ProcessingOutcome::Success,
            detail: None,
            payload,
        }
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            outcome: ProcessingOutcome::Ignored,
            detail: Some(reason.into()),
            payload,
        }
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            outcome: ProcessingOutcome::Failed,
            detail: Some(error.into()),
            payload,
        }
    }
}

/// Result of attempting to save a webhook event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event id.
    Inserted,
    /// Another delivery already inserted it.
    AlreadyExists,
}

/// Port for the processed-event audit trail.
///
/// Implementations must rely on a uniqueness constraint on `event_id` so
/// concurrent deliveries of the same event race safely.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by provider event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Attempt to save a record with `ON CONFLICT DO NOTHING` semantics.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Delete records processed before the cutoff. Returns the count removed.
    /// Retention cleanup; typical policy keeps 30 days.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
}

/// Result of webhook processing, as seen by the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// Event was processed by a handler.
    Processed,
    /// Event id was seen before; skipped.
    AlreadyProcessed,
}


#[cfg(test)]
mod tests {
    use super::test_support::InMemoryWebhookEventRepository;
    use super::*;

    #[test]
    fn record_constructors_set_outcome() {
        let ok = WebhookEventRecord::success(
            "evt_1",
            "payment_intent.succeeded",
            serde_json::json!({"id": "evt_1"}),
        );
        assert_eq!(ok.outcome, ProcessingOutcome::Success);
        assert!(ok.detail.is_none());

        let skipped = WebhookEventRecord::ignored(
            "evt_2",
            "charge.refunded",
            "unrecognized event type",
            serde_json::json!({}),
        );
        assert_eq!(skipped.outcome, ProcessingOutcome::Ignored);
        assert_eq!(skipped.detail.as_deref(), Some("unrecognized event type"));

        let broken = WebhookEventRecord::failed(
            "evt_3",
            "invoice.payment_failed",
            "db pool closed",
            serde_json::json!({}),
        );
        assert_eq!(broken.outcome, ProcessingOutcome::Failed);
    }

    #[test]
    fn outcome_string_roundtrip() {
        for outcome in [
            ProcessingOutcome::Success,
            ProcessingOutcome::Ignored,
            ProcessingOutcome::Failed,
        ] {
            assert_eq!(ProcessingOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(ProcessingOutcome::parse("retried"), None);
    }

    #[tokio::test]
    async fn save_dedups_by_event_id() {
        let repo = InMemoryWebhookEventRepository::new();
        let first = WebhookEventRecord::success("evt_dup", "invoice.paid", serde_json::json!({}));
        let second = WebhookEventRecord::success("evt_dup", "invoice.paid", serde_json::json!({}));

        assert_eq!(repo.save(first).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.save(second).await.unwrap(), SaveResult::AlreadyExists);
    }

    #[tokio::test]
    async fn find_returns_saved_record() {
        let repo = InMemoryWebhookEventRepository::new();
        assert!(repo.find_by_event_id("evt_1").await.unwrap().is_none());

        repo.save(WebhookEventRecord::success(
            "evt_1",
            "payment_intent.succeeded",
            serde_json::json!({}),
        ))
        .await
        .unwrap();

        let found = repo.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(found.event_type, "payment_intent.succeeded");
    }

    #[tokio::test]
    async fn delete_before_applies_retention() {
        let repo = InMemoryWebhookEventRepository::new();

        let old = WebhookEventRecord {
            event_id: "evt_old".to_string(),
            event_type: "invoice.paid".to_string(),
            processed_at: Utc::now() - chrono::Duration::days(60),
            outcome: ProcessingOutcome::Success,
            detail: None,
            payload: serde_json::json!({}),
        };
        let fresh =
            WebhookEventRecord::success("evt_fresh", "invoice.paid", serde_json::json!({}));

        repo.save(old).await.unwrap();
        repo.save(fresh).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        assert_eq!(repo.delete_before(cutoff).await.unwrap(), 1);
        assert!(repo.find_by_event_id("evt_old").await.unwrap().is_none());
        assert!(repo.find_by_event_id("evt_fresh").await.unwrap().is_some());
    }
}
