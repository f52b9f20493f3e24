// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ChatwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelBinding, Chatbot, Conversation, ConversationKey, ConversationUpdate};

/// Adapter for storage and persistence backends.
///
/// Writes follow last-write-wins semantics except for
/// [`StorageAdapter::update_conversation`], which is conditional on the
/// conversation version.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ChatwireError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ChatwireError>;

    // --- Channel bindings ---

    /// Looks up the binding for a provider channel id.
    async fn get_channel_binding(
        &self,
        channel_id: &str,
    ) -> Result<Option<ChannelBinding>, ChatwireError>;

    /// Creates or replaces a channel binding.
    async fn upsert_channel_binding(&self, binding: &ChannelBinding) -> Result<(), ChatwireError>;

    /// Removes a channel binding. Returns `false` if none existed.
    async fn delete_channel_binding(&self, channel_id: &str) -> Result<bool, ChatwireError>;

    // --- Chatbots ---

    /// Looks up a chatbot with its AI settings and flow.
    async fn get_chatbot(&self, chatbot_id: &str) -> Result<Option<Chatbot>, ChatwireError>;

    /// Creates or replaces a chatbot.
    async fn upsert_chatbot(&self, chatbot: &Chatbot) -> Result<(), ChatwireError>;

    // --- Conversations ---

    /// Finds the conversation for a composite key, with its full history.
    async fn find_conversation(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, ChatwireError>;

    /// Loads a conversation by id, with its full history.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ChatwireError>;

    /// Inserts a new conversation and its initial messages.
    ///
    /// Fails with [`ChatwireError::Conflict`] if a conversation already exists for the key.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ChatwireError>;

    /// Appends messages and sets the state, if the stored version still matches.
    ///
    /// Returns the new version, or [`ChatwireError::Conflict`] when another writer got there first.
    async fn update_conversation(&self, update: &ConversationUpdate) -> Result<i64, ChatwireError>;

    /// Sets the operator takeover flag on a conversation.
    async fn set_auto_reply_disabled(
        &self,
        conversation_id: &str,
        disabled: bool,
    ) -> Result<(), ChatwireError>;

    // --- Inbound receipts ---

    /// Records a provider message id. Returns `true` the first time an id is seen.
    async fn record_receipt(
        &self,
        message_id: &str,
        channel_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<bool, ChatwireError>;

    /// Deletes receipts older than the cutoff. Returns the number removed.
    async fn prune_receipts(&self, older_than: DateTime<Utc>) -> Result<usize, ChatwireError>;
}
