// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Chatwire pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ChatwireError;

/// Channel name recorded on every WhatsApp conversation key.
pub const WHATSAPP_CHANNEL: &str = "whatsapp";

/// Provider-assigned identifier of a sent or received message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
}

/// Author role of a stored or provider-bound message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

// --- Inbound ---

/// A normalized inbound message, produced once at the webhook boundary.
///
/// Nothing past the normalizer looks at the raw provider payload again.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Provider message id, used as the de-duplication key.
    pub message_id: String,
    /// Provider phone-number id the message was delivered to.
    pub channel_id: String,
    /// Sender address (WhatsApp id).
    pub from: String,
    /// Origination time in seconds since the Unix epoch.
    pub timestamp: i64,
    pub content: InboundContent,
    /// Display name from the contact profile, when the provider sent one.
    pub profile_name: Option<String>,
}

/// Content of an inbound message. Exactly one of text or a selection is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundContent {
    /// A free-text message.
    Text { body: String },
    /// A reply-button or list selection.
    Interactive { selection_id: String, title: String },
}

impl InboundContent {
    /// The human-readable text of the message: the body, or the selected option's title.
    pub fn text(&self) -> &str {
        match self {
            InboundContent::Text { body } => body,
            InboundContent::Interactive { title, .. } => title,
        }
    }

    /// The selected option id for interactive replies.
    pub fn selection_id(&self) -> Option<&str> {
        match self {
            InboundContent::Text { .. } => None,
            InboundContent::Interactive { selection_id, .. } => Some(selection_id),
        }
    }
}

// --- Outbound ---

/// An outbound message to be sent through a channel adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Provider phone-number id to send from.
    pub channel_id: String,
    /// Recipient address.
    pub to: String,
    pub content: OutboundContent,
}

/// Body of an outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundContent {
    /// Plain text, typically an AI reply.
    Text(String),
    /// A question-flow prompt with selectable options.
    Flow(FlowPrompt),
}

impl OutboundContent {
    /// The form stored in conversation history: text verbatim, flow prompts as JSON.
    pub fn to_stored(&self) -> Result<String, ChatwireError> {
        match self {
            OutboundContent::Text(text) => Ok(text.clone()),
            OutboundContent::Flow(prompt) => prompt.to_json(),
        }
    }
}

/// A question-flow node rendered for sending.
///
/// Serialized as JSON when appended to the conversation so the history keeps
/// the full structure of what the user was asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPrompt {
    pub node_id: String,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<FlowPromptOption>,
}

/// One selectable option of a [`FlowPrompt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPromptOption {
    pub id: String,
    pub label: String,
}

impl FlowPrompt {
    /// Serializes the prompt for storage.
    pub fn to_json(&self) -> Result<String, ChatwireError> {
        serde_json::to_string(self).map_err(|e| ChatwireError::Internal(format!(
            "failed to serialize flow prompt: {e}"
        )))
    }

    /// Parses a stored prompt. Returns `None` for anything that is not a flow prompt.
    pub fn parse(stored: &str) -> Option<Self> {
        let trimmed = stored.trim_start();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Plain-text rendering: the prompt followed by numbered option labels.
    pub fn plain_text(&self) -> String {
        let mut text = self.prompt.clone();
        for (i, option) in self.options.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", i + 1, option.label));
        }
        text
    }
}

// --- Conversations ---

/// Composite identity of a conversation. At most one conversation exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub chatbot_id: String,
    pub channel: String,
    /// The external peer's address.
    pub peer_address: String,
    /// The chatbot's own address on the channel (display phone number).
    pub channel_address: String,
}

impl ConversationKey {
    /// Builds a WhatsApp conversation key.
    pub fn whatsapp(
        chatbot_id: impl Into<String>,
        peer_address: impl Into<String>,
        channel_address: impl Into<String>,
    ) -> Self {
        Self {
            chatbot_id: chatbot_id.into(),
            channel: WHATSAPP_CHANNEL.to_string(),
            peer_address: peer_address.into(),
            channel_address: channel_address.into(),
        }
    }

    /// Flat string form used for in-process locking and log fields.
    pub fn lock_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.chatbot_id, self.channel, self.channel_address, self.peer_address
        )
    }
}

/// Which component owns the next turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ConversationState {
    /// Free conversation handled by the AI orchestrator.
    #[default]
    Ai,
    /// A flow prompt for `node_id` was sent and awaits a choice.
    Flow { node_id: String },
}

/// Delivery marker on assistant messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// One entry of a conversation's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    /// Who wrote it: the peer address, `"bot"`, or `"flow"`.
    pub author: String,
    pub timestamp: DateTime<Utc>,
    /// Set on assistant messages once dispatch has been attempted.
    #[serde(default)]
    pub delivery: Option<DeliveryStatus>,
}

impl StoredMessage {
    /// A user message authored by the peer.
    pub fn user(content: impl Into<String>, author: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            author: author.into(),
            timestamp,
            delivery: None,
        }
    }

    /// An assistant message with the outcome of its dispatch.
    pub fn assistant(
        content: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
        delivery: DeliveryStatus,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            author: author.into(),
            timestamp,
            delivery: Some(delivery),
        }
    }
}

/// A conversation thread between one chatbot and one peer on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub key: ConversationKey,
    pub messages: Vec<StoredMessage>,
    /// When true, the pipeline sends nothing on this conversation.
    pub disable_auto_reply: bool,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every write.
    pub version: i64,
}

/// An append-and-update against a known conversation version.
#[derive(Debug, Clone)]
pub struct ConversationUpdate {
    pub conversation_id: String,
    /// The version the caller read; the write fails with a conflict if it moved.
    pub expected_version: i64,
    pub append: Vec<StoredMessage>,
    pub state: ConversationState,
    pub updated_at: DateTime<Utc>,
}

// --- Channels and chatbots ---

/// Binds a provider channel (phone-number id) to the chatbot that answers on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub channel_id: String,
    pub chatbot_id: String,
    /// The chatbot's public address on this channel.
    pub display_address: String,
    /// Initial `disable_auto_reply` for conversations created on this channel.
    #[serde(default)]
    pub auto_reply_disabled_default: bool,
    #[serde(default)]
    pub settings: ChannelSettings,
}

/// Per-channel tuning of the reply path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Seconds to wait before sending a reply.
    #[serde(default)]
    pub reply_delay_secs: u64,
    /// Replaces the chatbot's system prompt for conversations on this channel.
    #[serde(default)]
    pub system_prompt_override: Option<String>,
}

/// A chatbot with its AI settings and optional question flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatbot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub flow: Option<QuestionFlow>,
}

impl Chatbot {
    /// Whether AI replies may be produced when the flow does not claim the turn.
    ///
    /// Chatbots without a flow are AI-only.
    pub fn ai_response_enabled(&self) -> bool {
        self.flow.as_ref().is_none_or(|f| f.ai_response_enabled)
    }
}

/// Per-chatbot completion settings. Unset fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
}

/// An operator-authored scripted dialogue graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFlow {
    pub nodes: Vec<FlowNode>,
    /// Inactivity window after which the flow restarts at the initial node.
    #[serde(default = "default_restart_timeout_minutes")]
    pub restart_timeout_minutes: u32,
    /// Whether AI replies are allowed when the flow does not claim a turn.
    #[serde(default = "default_ai_response_enabled")]
    pub ai_response_enabled: bool,
}

fn default_restart_timeout_minutes() -> u32 {
    30
}

fn default_ai_response_enabled() -> bool {
    true
}

/// A node of a [`QuestionFlow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub prompt: String,
    /// Empty for terminal nodes.
    #[serde(default)]
    pub options: Vec<FlowOption>,
    #[serde(default)]
    pub is_initial: bool,
}

/// What the flow engine does with input that matches none of the current node's options.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnmatchedInputPolicy {
    /// Send the current node's prompt again.
    #[default]
    Reprompt,
    /// Leave the flow and let the AI answer, when AI replies are enabled.
    FallbackToAi,
}

/// A selectable option leading to another node, or ending the flow when `target_node_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub target_node_id: Option<String>,
}

// --- Provider ---

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

/// Fully resolved model parameters for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// A request to an AI completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<ProviderMessage>,
    pub model: ModelConfig,
}

/// Token accounting returned by the provider, when available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A completion returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}
