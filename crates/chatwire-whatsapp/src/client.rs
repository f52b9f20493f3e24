// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter.

use std::time::Duration;

use async_trait::async_trait;
use chatwire_config::model::WhatsAppConfig;
use chatwire_core::types::{AdapterType, HealthStatus, MessageId, OutboundMessage};
use chatwire_core::{ChannelAdapter, ChatwireError, PluginAdapter};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::render::{message_body, read_receipt_body};

/// Response of `POST /{phone_number_id}/messages`.
#[derive(Debug, Deserialize)]
struct CloudApiResponse {
    #[serde(default)]
    messages: Option<Vec<CloudApiMessage>>,
    #[serde(default)]
    error: Option<CloudApiError>,
}

#[derive(Debug, Deserialize)]
struct CloudApiMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CloudApiError {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Sends messages and read receipts through the Cloud API.
///
/// One adapter serves every bound phone number; the sender is chosen per
/// message by [`OutboundMessage::channel_id`].
#[derive(Debug, Clone)]
pub struct WhatsAppChannel {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl WhatsAppChannel {
    /// Build the adapter from `[whatsapp]` config. An access token is required.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, ChatwireError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ChatwireError::Config("whatsapp.access_token is required to send messages".into())
            })?;
        let channel = Self::with_base_url(
            &access_token,
            &config.graph_base_url,
            &config.api_version,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        info!(api_version = %config.api_version, "whatsapp channel initialized");
        Ok(channel)
    }

    /// Build against an explicit Graph API base URL.
    pub fn with_base_url(
        access_token: &str,
        base_url: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, ChatwireError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatwireError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn messages_url(&self, phone_number_id: &str) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, phone_number_id
        )
    }

    async fn post(&self, phone_number_id: &str, body: &Value) -> Result<CloudApiResponse, ChatwireError> {
        let response = self
            .client
            .post(self.messages_url(phone_number_id))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatwireError::Channel {
                message: format!("Cloud API request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<CloudApiResponse>(&text).ok();

        if !status.is_success() {
            let detail = match parsed.and_then(|r| r.error) {
                Some(err) => format!(
                    "{} (code {})",
                    err.message,
                    err.code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
                ),
                None => text,
            };
            warn!(status = %status, phone_number_id, "Cloud API rejected request");
            return Err(ChatwireError::Channel {
                message: format!("Cloud API returned {status}: {detail}"),
                source: None,
            });
        }

        parsed.ok_or_else(|| ChatwireError::Channel {
            message: format!("unparseable Cloud API response: {text}"),
            source: None,
        })
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatwireError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ChatwireError> {
        let body = message_body(&msg.to, &msg.content);
        let response = self.post(&msg.channel_id, &body).await?;

        if let Some(err) = response.error {
            return Err(ChatwireError::Channel {
                message: format!("Cloud API error: {}", err.message),
                source: None,
            });
        }
        let id = response
            .messages
            .and_then(|m| m.into_iter().next())
            .map(|m| m.id)
            .ok_or_else(|| ChatwireError::Channel {
                message: "Cloud API response carried no message id".into(),
                source: None,
            })?;
        debug!(message_id = %id, to = %msg.to, "whatsapp message sent");
        Ok(MessageId(id))
    }

    async fn mark_read(&self, channel_id: &str, message_id: &str) -> Result<(), ChatwireError> {
        self.post(channel_id, &read_receipt_body(message_id)).await?;
        debug!(message_id, "marked as read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::{FlowPrompt, FlowPromptOption, OutboundContent};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer) -> WhatsAppChannel {
        WhatsAppChannel::with_base_url("EAAG-test", &server.uri(), "v21.0", Duration::from_secs(5))
            .unwrap()
    }

    fn sent(id: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": "5511999", "wa_id": "5511999"}],
            "messages": [{"id": id}]
        }))
    }

    #[tokio::test]
    async fn send_text_posts_to_phone_number_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/pn-1/messages"))
            .and(header("authorization", "Bearer EAAG-test"))
            .and(body_partial_json(json!({
                "messaging_product": "whatsapp",
                "to": "5511999",
                "type": "text",
                "text": {"body": "Hello"}
            })))
            .respond_with(sent("wamid.out.1"))
            .expect(1)
            .mount(&server)
            .await;

        let id = channel(&server)
            .send(OutboundMessage {
                channel_id: "pn-1".into(),
                to: "5511999".into(),
                content: OutboundContent::Text("Hello".into()),
            })
            .await
            .unwrap();
        assert_eq!(id, MessageId("wamid.out.1".into()));
    }

    #[tokio::test]
    async fn send_flow_prompt_uses_buttons() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/pn-1/messages"))
            .and(body_partial_json(json!({
                "type": "interactive",
                "interactive": {"type": "button"}
            })))
            .respond_with(sent("wamid.out.2"))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = FlowPrompt {
            node_id: "start".into(),
            prompt: "How can we help?".into(),
            options: vec![
                FlowPromptOption {
                    id: "sales".into(),
                    label: "Sales".into(),
                },
                FlowPromptOption {
                    id: "support".into(),
                    label: "Support".into(),
                },
            ],
        };
        channel(&server)
            .send(OutboundMessage {
                channel_id: "pn-1".into(),
                to: "5511999".into(),
                content: OutboundContent::Flow(prompt),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_error_maps_to_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Recipient phone number not in allowed list", "code": 131030}
            })))
            .mount(&server)
            .await;

        let err = channel(&server)
            .send(OutboundMessage {
                channel_id: "pn-1".into(),
                to: "5511999".into(),
                content: OutboundContent::Text("Hello".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatwireError::Channel { .. }));
        assert!(err.to_string().contains("131030"), "got: {err}");
    }

    #[tokio::test]
    async fn mark_read_posts_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/pn-1/messages"))
            .and(body_partial_json(json!({"status": "read", "message_id": "wamid.in.1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server).mark_read("pn-1", "wamid.in.1").await.unwrap();
    }

    #[test]
    fn missing_access_token_is_config_error() {
        let err = WhatsAppChannel::new(&WhatsAppConfig::default()).unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
    }
}
