// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatwire_core::types::{AdapterType, HealthStatus, MessageId, OutboundMessage};
use chatwire_core::{ChannelAdapter, ChatwireError, PluginAdapter};

/// A mock messaging channel.
///
/// Messages passed to `send()` are captured for assertions. With
/// [`MockChannel::set_failing`] every send is rejected instead (and not captured).
#[derive(Default)]
pub struct MockChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    read: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with a channel error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All messages accepted by `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// `(channel_id, message_id)` pairs passed to `mark_read()`.
    pub async fn read_receipts(&self) -> Vec<(String, String)> {
        self.read.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
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
impl ChannelAdapter for MockChannel {
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ChatwireError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatwireError::Channel {
                message: "mock channel is failing".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn mark_read(&self, channel_id: &str, message_id: &str) -> Result<(), ChatwireError> {
        self.read
            .lock()
            .await
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }
}
