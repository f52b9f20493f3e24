// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the outbound side of a messaging provider.

use async_trait::async_trait;

use crate::error::ChatwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MessageId, OutboundMessage};

/// Adapter for sending messages through a messaging provider.
///
/// Inbound traffic arrives through the webhook gateway, so channel adapters
/// only cover delivery and read receipts.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Sends a message and returns the provider's id for it.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ChatwireError>;

    /// Marks an inbound message as read.
    async fn mark_read(&self, channel_id: &str, message_id: &str) -> Result<(), ChatwireError>;
}
