// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookup, creation and continuity.
//!
//! Callers hold the conversation's [`KeyGuard`](crate::locks::KeyGuard) around
//! every method here. Writes are still conditional on the stored version, so a
//! second process writing the same database loses with a conflict instead of
//! overwriting history; a conflicted write is re-read and retried.

use std::sync::Arc;

use chatwire_core::types::{
    ChannelBinding, Chatbot, Conversation, ConversationKey, ConversationState, ConversationUpdate,
    StoredMessage,
};
use chatwire_core::{ChatwireError, StorageAdapter};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

const MAX_WRITE_ATTEMPTS: usize = 3;

/// The conversation as it stands after the inbound user message was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub conversation: Conversation,
    /// The conversation was created by this turn.
    pub is_new: bool,
    /// The flow engine should take this turn, if the chatbot has a flow.
    pub should_restart_flow: bool,
    /// The flow must start over at its initial node rather than resume.
    pub restart_at_initial: bool,
}

/// Reads and writes conversations on behalf of the turn pipeline.
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<dyn StorageAdapter>,
    default_restart_timeout_minutes: u32,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn StorageAdapter>, default_restart_timeout_minutes: u32) -> Self {
        Self {
            storage,
            default_restart_timeout_minutes,
        }
    }

    /// Find the conversation for `key` or create it, recording `message`.
    ///
    /// Continuity rules for an existing conversation: a pending flow prompt,
    /// an idle gap longer than the restart timeout, or a flow that forbids AI
    /// replies all hand the turn to the flow engine. Only a new conversation
    /// or the timeout sends the flow back to its initial node.
    pub async fn get_or_create(
        &self,
        chatbot: &Chatbot,
        binding: &ChannelBinding,
        key: &ConversationKey,
        message: StoredMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationTurn, ChatwireError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let result = match self.storage.find_conversation(key).await? {
                None => self.create(binding, key, &message, now).await,
                Some(existing) => self.continue_existing(chatbot, existing, &message, now).await,
            };
            match result {
                Err(ChatwireError::Conflict { message: reason }) => {
                    warn!(attempt, conversation_key = %key.lock_key(), reason = %reason, "conversation write conflict, re-reading");
                }
                other => return other,
            }
        }
        Err(ChatwireError::Conflict {
            message: format!(
                "conversation {} kept changing after {MAX_WRITE_ATTEMPTS} attempts",
                key.lock_key()
            ),
        })
    }

    async fn create(
        &self,
        binding: &ChannelBinding,
        key: &ConversationKey,
        message: &StoredMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationTurn, ChatwireError> {
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.clone(),
            messages: vec![message.clone()],
            disable_auto_reply: binding.auto_reply_disabled_default,
            state: ConversationState::Ai,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.storage.create_conversation(&conversation).await?;
        info!(
            conversation_id = %conversation.id,
            chatbot_id = %key.chatbot_id,
            disable_auto_reply = conversation.disable_auto_reply,
            "conversation created"
        );
        Ok(ConversationTurn {
            conversation,
            is_new: true,
            should_restart_flow: true,
            restart_at_initial: true,
        })
    }

    async fn continue_existing(
        &self,
        chatbot: &Chatbot,
        mut conversation: Conversation,
        message: &StoredMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationTurn, ChatwireError> {
        let timeout_minutes = chatbot
            .flow
            .as_ref()
            .map_or(self.default_restart_timeout_minutes, |f| f.restart_timeout_minutes);
        let timed_out = now - conversation.updated_at > chrono::Duration::minutes(i64::from(timeout_minutes));
        let awaiting_choice = matches!(conversation.state, ConversationState::Flow { .. });
        let ai_disabled = chatbot.flow.as_ref().is_some_and(|f| !f.ai_response_enabled);

        let version = self
            .storage
            .update_conversation(&ConversationUpdate {
                conversation_id: conversation.id.clone(),
                expected_version: conversation.version,
                append: vec![message.clone()],
                state: conversation.state.clone(),
                updated_at: now,
            })
            .await?;

        debug!(
            conversation_id = %conversation.id,
            timed_out,
            awaiting_choice,
            ai_disabled,
            "continuing conversation"
        );
        conversation.messages.push(message.clone());
        conversation.updated_at = now;
        conversation.version = version;

        Ok(ConversationTurn {
            conversation,
            is_new: false,
            should_restart_flow: awaiting_choice || timed_out || ai_disabled,
            restart_at_initial: timed_out,
        })
    }

    /// Append `messages` and move to `state`, re-reading the version on conflict.
    ///
    /// Updates `conversation` in place with what was written. After a conflict
    /// it also carries the re-read history and takeover flag, so an operator
    /// takeover that landed mid-turn is visible to the caller.
    pub async fn record(
        &self,
        conversation: &mut Conversation,
        messages: Vec<StoredMessage>,
        state: ConversationState,
        now: DateTime<Utc>,
    ) -> Result<(), ChatwireError> {
        let mut expected_version = conversation.version;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let update = ConversationUpdate {
                conversation_id: conversation.id.clone(),
                expected_version,
                append: messages.clone(),
                state: state.clone(),
                updated_at: now,
            };
            match self.storage.update_conversation(&update).await {
                Ok(version) => {
                    conversation.messages.extend(messages);
                    conversation.state = state;
                    conversation.updated_at = now;
                    conversation.version = version;
                    return Ok(());
                }
                Err(ChatwireError::Conflict { .. }) => {
                    let current = self
                        .storage
                        .get_conversation(&conversation.id)
                        .await?
                        .ok_or_else(|| ChatwireError::not_found("conversation", conversation.id.clone()))?;
                    warn!(attempt, conversation_id = %conversation.id, version = current.version, "retrying conversation write");
                    expected_version = current.version;
                    conversation.messages = current.messages;
                    conversation.disable_auto_reply = current.disable_auto_reply;
                }
                Err(e) => return Err(e),
            }
        }
        Err(ChatwireError::Conflict {
            message: format!(
                "conversation {} kept changing after {MAX_WRITE_ATTEMPTS} attempts",
                conversation.id
            ),
        })
    }
}
