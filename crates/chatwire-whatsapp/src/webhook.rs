// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload model and normalization.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! provider payload is ignored.

use chatwire_core::types::{InboundContent, InboundMessage};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
    /// Delivery/read status callbacks. Never normalized.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `value.messages[]`.
#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    /// Seconds since the epoch; the provider sends it as a string.
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    /// Quick-reply button on a template message.
    #[serde(default)]
    pub button: Option<TemplateButton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub button_reply: Option<Reply>,
    #[serde(default)]
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateButton {
    #[serde(default)]
    pub payload: Option<String>,
    pub text: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Flatten a webhook delivery into normalized inbound messages.
///
/// Each `messages[]` entry yields at most one message. Status callbacks,
/// media, unknown types and blank text produce nothing.
pub fn normalize(payload: &WebhookPayload) -> Vec<InboundMessage> {
    let mut out = Vec::new();
    for change in payload.entry.iter().flat_map(|e| e.changes.iter()) {
        let value = &change.value;
        let Some(metadata) = &value.metadata else {
            if !value.messages.is_empty() {
                warn!("webhook change without metadata, skipping its messages");
            }
            continue;
        };
        if !value.statuses.is_empty() {
            debug!(count = value.statuses.len(), "ignoring status callbacks");
        }

        for message in &value.messages {
            let Some(content) = message_content(message) else {
                debug!(message_id = %message.id, kind = %message.kind, "ignoring unsupported message");
                continue;
            };
            out.push(InboundMessage {
                message_id: message.id.clone(),
                channel_id: metadata.phone_number_id.clone(),
                from: message.from.clone(),
                timestamp: message.timestamp,
                content,
                profile_name: profile_name(&value.contacts, &message.from),
            });
        }
    }
    out
}

fn message_content(message: &WaMessage) -> Option<InboundContent> {
    match message.kind.as_str() {
        "text" => {
            let body = message.text.as_ref()?.body.trim();
            (!body.is_empty()).then(|| InboundContent::Text {
                body: body.to_string(),
            })
        }
        "interactive" => {
            let interactive = message.interactive.as_ref()?;
            let reply = match interactive.kind.as_str() {
                "button_reply" => interactive.button_reply.as_ref(),
                "list_reply" => interactive.list_reply.as_ref(),
                _ => None,
            }?;
            Some(InboundContent::Interactive {
                selection_id: reply.id.clone(),
                title: reply.title.clone(),
            })
        }
        "button" => {
            let button = message.button.as_ref()?;
            Some(InboundContent::Interactive {
                selection_id: button.payload.clone().unwrap_or_else(|| button.text.clone()),
                title: button.text.clone(),
            })
        }
        _ => None,
    }
}

fn profile_name(contacts: &[Contact], from: &str) -> Option<String> {
    contacts
        .iter()
        .find(|c| c.wa_id.as_deref() == Some(from))
        .or_else(|| contacts.first())
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.clone())
        .filter(|n| !n.trim().is_empty())
}

/// Answer the webhook subscription handshake.
///
/// Returns the challenge to echo when `mode` is `subscribe` and the token matches.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    if expected_token.is_empty() || mode != Some("subscribe") || token != Some(expected_token) {
        return None;
    }
    challenge
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery(messages: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550100", "phone_number_id": "pn-1"},
                        "contacts": [{"wa_id": "5511999", "profile": {"name": "Maria"}}],
                        "messages": messages
                    }
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn text_message_normalizes() {
        let payload = delivery(json!([{
            "from": "5511999", "id": "wamid.1", "timestamp": "1760000000",
            "type": "text", "text": {"body": "  Hello there "}
        }]));
        let messages = normalize(&payload);
        assert_eq!(
            messages,
            vec![InboundMessage {
                message_id: "wamid.1".into(),
                channel_id: "pn-1".into(),
                from: "5511999".into(),
                timestamp: 1_760_000_000,
                content: InboundContent::Text {
                    body: "Hello there".into()
                },
                profile_name: Some("Maria".into()),
            }]
        );
    }

    #[test]
    fn button_and_list_replies_normalize_to_selections() {
        let payload = delivery(json!([
            {"from": "5511999", "id": "wamid.2", "timestamp": 1760000001, "type": "interactive",
             "interactive": {"type": "button_reply", "button_reply": {"id": "opt-a", "title": "Sales"}}},
            {"from": "5511999", "id": "wamid.3", "timestamp": "1760000002", "type": "interactive",
             "interactive": {"type": "list_reply", "list_reply": {"id": "opt-b", "title": "Support", "description": "x"}}},
            {"from": "5511999", "id": "wamid.4", "timestamp": "1760000003", "type": "button",
             "button": {"payload": "opt-c", "text": "Billing"}}
        ]));
        let selections: Vec<_> = normalize(&payload)
            .into_iter()
            .map(|m| (m.content.selection_id().map(String::from), m.content.text().to_string()))
            .collect();
        assert_eq!(
            selections,
            vec![
                (Some("opt-a".into()), "Sales".into()),
                (Some("opt-b".into()), "Support".into()),
                (Some("opt-c".into()), "Billing".into()),
            ]
        );
    }

    #[test]
    fn unsupported_and_blank_messages_are_dropped() {
        let payload = delivery(json!([
            {"from": "5511999", "id": "wamid.5", "timestamp": "1", "type": "image", "image": {"id": "media-1"}},
            {"from": "5511999", "id": "wamid.6", "timestamp": "1", "type": "text", "text": {"body": "   "}},
            {"from": "5511999", "id": "wamid.7", "timestamp": "1", "type": "interactive",
             "interactive": {"type": "nfm_reply"}}
        ]));
        assert!(normalize(&payload).is_empty());
    }

    #[test]
    fn status_callbacks_produce_nothing() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "pn-1"},
                "statuses": [{"id": "wamid.9", "status": "read"}]
            }}]}]
        }))
        .unwrap();
        assert!(normalize(&payload).is_empty());
    }

    #[test]
    fn empty_object_parses_and_yields_nothing() {
        let payload: WebhookPayload = serde_json::from_str("{}").unwrap();
        assert!(normalize(&payload).is_empty());
    }

    #[test]
    fn subscription_handshake() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("123"), "tok"),
            Some("123")
        );
        assert_eq!(verify_subscription(Some("subscribe"), Some("bad"), Some("123"), "tok"), None);
        assert_eq!(verify_subscription(Some("unsubscribe"), Some("tok"), Some("123"), "tok"), None);
        assert_eq!(verify_subscription(Some("subscribe"), Some(""), Some("123"), ""), None);
    }
}
