use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::WhatsAppConfig;

const CHANNEL: &str = "whatsapp";

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("WhatsApp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("WhatsApp API returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageText {
    pub body: String,
}

/// Payload of a text message to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMessage {
    pub recipient_type: &'static str,
    pub to: String,
    pub render_mentions: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: MessageText,
}

impl GroupMessage {
    pub fn text(group_id: &str, body: &str) -> Self {
        Self {
            recipient_type: "group",
            to: group_id.to_string(),
            render_mentions: false,
            kind: "text",
            text: MessageText {
                body: body.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    api_url: String,
    api_token: String,
    group_id: String,
}

/// Sends messages to the clinicians' group. Runs in mock mode, logging only,
/// when any credential is missing.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    credentials: Option<Credentials>,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        let credentials = match (&config.api_url, &config.api_token, &config.group_id) {
            (Some(url), Some(token), Some(group)) => Some(Credentials {
                api_url: url.trim_end_matches('/').to_string(),
                api_token: token.clone(),
                group_id: group.clone(),
            }),
            _ => None,
        };

        if credentials.is_none() {
            warn!("WhatsApp credentials not found. Group messages will be mocked.");
        }

        Self {
            http: reqwest::Client::new(),
            credentials,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.credentials.is_none()
    }

    pub async fn send_group_message(&self, body: &str) -> Result<(), NotificationError> {
        let Some(credentials) = &self.credentials else {
            info!("(Mock) Would send group message ({} chars)", body.len());
            crate::metrics::increment_notifications_sent(CHANNEL);
            return Ok(());
        };

        let message = GroupMessage::text(&credentials.group_id, body);
        let result = self
            .http
            .post(format!("{}/v1/messages", credentials.api_url))
            .bearer_auth(&credentials.api_token)
            .json(&message)
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(NotificationError::Rejected { status, body })
            }
            Err(e) => Err(NotificationError::Request(e)),
        };

        match &outcome {
            Ok(()) => {
                info!("Group message sent");
                crate::metrics::increment_notifications_sent(CHANNEL);
            }
            Err(e) => {
                error!("Failed to send group message: {}", e);
                crate::metrics::increment_notifications_failed(CHANNEL);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_message_matches_api_shape() {
        let message = GroupMessage::text("group-1", "New CS patient: Moyo");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "recipient_type": "group",
                "to": "group-1",
                "render_mentions": false,
                "type": "text",
                "text": {"body": "New CS patient: Moyo"}
            })
        );
    }

    #[test]
    fn partial_credentials_fall_back_to_mock() {
        let client = WhatsAppClient::new(&WhatsAppConfig {
            api_url: Some("https://wa.example".into()),
            api_token: None,
            group_id: Some("group-1".into()),
        });
        assert!(client.is_mock());
    }

    #[tokio::test]
    async fn mock_mode_accepts_messages() {
        let client = WhatsAppClient::new(&WhatsAppConfig::default());
        assert!(client.send_group_message("hello").await.is_ok());
    }
}
