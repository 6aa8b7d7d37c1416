//! Resend implementation of NotificationSender.
//!
//! Sends rendered messages through the Resend HTTP API
//! (`POST https://api.resend.com/emails`, bearer-token auth).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::domain::billing::notification::EmailMessage;
use crate::ports::{NotificationError, NotificationSender};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    /// API key (re_...).
    api_key: SecretString,

    /// From header, e.g. `Subhub Billing <billing@subhub.app>`.
    from: String,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
        }
    }
}

/// Sender that delivers through Resend.
pub struct ResendSender {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendSender {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[async_trait]
impl NotificationSender for ResendSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        debug!(to = %message.to, subject = %message.subject, "sending email via resend");

        let request = ResendRequest {
            from: &self.config.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
