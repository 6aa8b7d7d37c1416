//! NotificationSender port - outbound email delivery.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::notification::EmailMessage;

/// Failure modes of email delivery.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Transport failure (connect, TLS, timeout).
    #[error("email transport failed: {0}")]
    Transport(String),

    /// The delivery service rejected the message.
    #[error("email rejected by delivery service: status={status} body={body}")]
    Rejected { status: u16, body: String },
}

/// Port for sending rendered email messages.
///
/// Delivery is best-effort: webhook handlers log failures and continue, so
/// implementations should not retry internally.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Sender that records messages, optionally failing every send.
    pub struct RecordingSender {
        pub sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl RecordingSender {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent_messages(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Rejected {
                    status: 500,
                    body: "simulated failure".to_string(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
