//! LINE Messaging API push client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::common::errors::{ClientError, Result};
use crate::common::traits::Notifier;
use crate::config::types::NotifyConfig;

/// A single text message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Push request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub to: String,
    pub messages: Vec<TextMessage>,
}

impl PushRequest {
    pub fn text(to: &str, text: &str) -> Self {
        Self {
            to: to.to_string(),
            messages: vec![TextMessage {
                kind: "text".to_string(),
                text: text.to_string(),
            }],
        }
    }
}

/// Pushes text messages to one recipient
#[derive(Debug, Clone)]
pub struct LinePushNotifier {
    client: Client,
    push_url: String,
    access_token: String,
    recipient: String,
}

impl LinePushNotifier {
    pub fn new(push_url: &str, access_token: &str, recipient: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            push_url: push_url.to_string(),
            access_token: access_token.to_string(),
            recipient: recipient.to_string(),
        })
    }

    /// Build from configuration; `None` when the token or recipient is missing
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>> {
        match (&config.access_token, &config.recipient) {
            (Some(token), Some(recipient)) if !token.is_empty() && !recipient.is_empty() => {
                Ok(Some(Self::new(
                    &config.push_url,
                    token,
                    recipient,
                    Duration::from_secs(config.timeout_seconds),
                )?))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for LinePushNotifier {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn push(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.push_url)
            .bearer_auth(&self.access_token)
            .json(&PushRequest::text(&self.recipient, text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Notification(format!(
                "push returned status {}: {}",
                status, body
            )));
        }

        debug!("Notification pushed");
        Ok(())
    }
}
