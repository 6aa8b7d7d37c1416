//! Errors raised while receiving and processing webhook deliveries.

use thiserror::Error;

/// Failure modes of webhook verification and processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing, malformed, or not matching the payload.
    /// Surfaced to the sender as 401.
    #[error("webhook signature verification failed: {0}")]
    InvalidSignature(String),

    /// Timestamp in the signature header is outside the accepted window.
    #[error("webhook timestamp outside accepted window: event={event_ts} now={now_ts}")]
    TimestampOutOfRange { event_ts: i64, now_ts: i64 },

    /// Timestamp in the signature header is not a parseable integer.
    #[error("webhook timestamp is not a valid integer: {0}")]
    InvalidTimestamp(String),

    /// Signature header or payload could not be parsed.
    #[error("webhook parse failed: {0}")]
    ParseError(String),

    /// Event arrived from the wrong mode (test event on a live endpoint).
    #[error("webhook event rejected: livemode={actual}, expected livemode={expected}")]
    LivemodeMismatch { expected: bool, actual: bool },

    /// Event acknowledged but deliberately not acted on (unrecognized type,
    /// no matching user or record). Not a failure.
    #[error("webhook event ignored: {0}")]
    Ignored(String),

    /// Persistence failure while recording or reading processed events.
    #[error("webhook persistence failed: {0}")]
    Database(String),
}

impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

impl WebhookError {
    /// True when the sender should be told the request itself was bad
    /// (as opposed to us failing internally).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature(_)
                | Self::TimestampOutOfRange { .. }
                | Self::InvalidTimestamp(_)
                | Self::ParseError(_)
                | Self::LivemodeMismatch { .. }
        )
    }
}
