// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sends and the history entries they leave behind.

use std::sync::Arc;
use std::time::Duration;

use chatwire_core::types::{DeliveryStatus, MessageId, OutboundContent, OutboundMessage, StoredMessage};
use chatwire_core::{ChannelAdapter, ChatwireError};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Author recorded on flow prompts.
pub const FLOW_AUTHOR: &str = "flow";
/// Author recorded on AI replies.
pub const BOT_AUTHOR: &str = "bot";

/// Result of one send attempt.
#[derive(Debug)]
pub struct Dispatched {
    /// The assistant entry to append, marked delivered or failed.
    pub stored: StoredMessage,
    pub result: Result<MessageId, ChatwireError>,
}

#[derive(Clone)]
pub struct Dispatcher {
    channel: Arc<dyn ChannelAdapter>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn ChannelAdapter>) -> Self {
        Self { channel }
    }

    /// Wait `delay`, send once, and describe the outcome. Sends are never retried.
    ///
    /// The stored entry is stamped with the turn clock `now`, not the wall clock.
    pub async fn dispatch(
        &self,
        channel_id: &str,
        to: &str,
        content: OutboundContent,
        author: &str,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, ChatwireError> {
        let stored_content = content.to_stored()?;
        if !delay.is_zero() {
            debug!(delay_secs = delay.as_secs(), "delaying reply");
            tokio::time::sleep(delay).await;
        }

        let result = self
            .channel
            .send(OutboundMessage {
                channel_id: channel_id.to_string(),
                to: to.to_string(),
                content,
            })
            .await;
        let delivery = match &result {
            Ok(id) => {
                debug!(message_id = %id.0, to, "reply sent");
                DeliveryStatus::Delivered
            }
            Err(e) => {
                warn!(error = %e, to, "reply send failed");
                DeliveryStatus::Failed
            }
        };
        Ok(Dispatched {
            stored: StoredMessage::assistant(stored_content, author, now, delivery),
            result,
        })
    }
}
