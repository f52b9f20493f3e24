// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` assembles a [`TurnPipeline`] over a temp SQLite database and
//! mock adapters, and builds inbound messages addressed to the bound channel.

use std::sync::Arc;
use std::time::Duration;

use chatwire_agent::{PipelineSettings, TurnOutcome, TurnPipeline};
use chatwire_config::model::StorageConfig;
use chatwire_core::types::{
    ChannelBinding, Chatbot, Conversation, ConversationKey, InboundContent, InboundMessage,
};
use chatwire_core::{ChannelAdapter, ChatwireError, ProviderAdapter, StorageAdapter};
use chatwire_storage::SqliteStorage;
use chrono::{DateTime, Utc};

use crate::fixtures::{self, CHANNEL_ID, DISPLAY_ADDRESS, PEER};
use crate::mock_channel::MockChannel;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    provider_delay: Option<Duration>,
    with_provider: bool,
    settings: PipelineSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            provider_delay: None,
            with_provider: true,
            settings: PipelineSettings {
                mark_read: false,
                ..PipelineSettings::default()
            },
        }
    }

    /// Set mock provider replies.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Delay every mock completion.
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    /// Build the pipeline with no completion provider.
    pub fn without_provider(mut self) -> Self {
        self.with_provider = false;
        self
    }

    /// Adjust pipeline settings.
    pub fn with_settings(mut self, f: impl FnOnce(&mut PipelineSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ChatwireError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ChatwireError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let mut provider = MockProvider::with_responses(self.responses);
        if let Some(delay) = self.provider_delay {
            provider = provider.with_delay(delay);
        }
        let mock_provider = Arc::new(provider);
        let mock_channel = Arc::new(MockChannel::new());

        let provider: Option<Arc<dyn ProviderAdapter>> = if self.with_provider {
            Some(Arc::clone(&mock_provider) as Arc<dyn ProviderAdapter>)
        } else {
            None
        };
        let pipeline = Arc::new(TurnPipeline::new(
            Arc::clone(&storage),
            Arc::clone(&mock_channel) as Arc<dyn ChannelAdapter>,
            provider,
            self.settings,
        ));

        Ok(TestHarness {
            mock_provider,
            mock_channel,
            storage,
            pipeline,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub mock_provider: Arc<MockProvider>,
    pub mock_channel: Arc<MockChannel>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    pub pipeline: Arc<TurnPipeline>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Store `chatbot` and bind the harness channel to it.
    pub async fn register(&self, chatbot: &Chatbot) -> Result<(), ChatwireError> {
        self.register_with(chatbot, fixtures::binding()).await
    }

    /// Store `chatbot` and a custom binding for it.
    pub async fn register_with(
        &self,
        chatbot: &Chatbot,
        binding: ChannelBinding,
    ) -> Result<(), ChatwireError> {
        self.storage.upsert_chatbot(chatbot).await?;
        self.storage.upsert_channel_binding(&binding).await
    }

    /// A text message from the default peer, originated now.
    pub fn text(&self, body: &str) -> InboundMessage {
        inbound(InboundContent::Text { body: body.into() }, Utc::now())
    }

    /// A reply-button selection from the default peer, originated now.
    pub fn selection(&self, selection_id: &str, title: &str) -> InboundMessage {
        inbound(
            InboundContent::Interactive {
                selection_id: selection_id.into(),
                title: title.into(),
            },
            Utc::now(),
        )
    }

    pub async fn send(&self, message: InboundMessage) -> TurnOutcome {
        self.pipeline.handle(message).await
    }

    pub async fn send_text(&self, body: &str) -> TurnOutcome {
        self.send(self.text(body)).await
    }

    /// The conversation between the default peer and `chatbot_id`.
    pub async fn conversation(&self, chatbot_id: &str) -> Result<Option<Conversation>, ChatwireError> {
        let key = ConversationKey::whatsapp(chatbot_id, PEER, DISPLAY_ADDRESS);
        self.storage.find_conversation(&key).await
    }
}

/// An inbound message from the default peer to the harness channel.
pub fn inbound(content: InboundContent, originated: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        message_id: format!("wamid.test.{}", uuid::Uuid::new_v4()),
        channel_id: CHANNEL_ID.into(),
        from: PEER.into(),
        timestamp: originated.timestamp(),
        content,
        profile_name: Some("Test User".into()),
    }
}
