// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use chatwire_config::model::StorageConfig;
use chatwire_core::types::{
    ChannelBinding, Chatbot, Conversation, ConversationKey, ConversationUpdate,
};
use chatwire_core::{AdapterType, ChatwireError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened lazily by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage; nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ChatwireError> {
        self.db.get().ok_or_else(|| ChatwireError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatwireError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatwireError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ChatwireError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ChatwireError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ChatwireError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn get_channel_binding(
        &self,
        channel_id: &str,
    ) -> Result<Option<ChannelBinding>, ChatwireError> {
        queries::bindings::get_binding(self.db()?, channel_id).await
    }

    async fn upsert_channel_binding(&self, binding: &ChannelBinding) -> Result<(), ChatwireError> {
        queries::bindings::upsert_binding(self.db()?, binding).await
    }

    async fn delete_channel_binding(&self, channel_id: &str) -> Result<bool, ChatwireError> {
        queries::bindings::delete_binding(self.db()?, channel_id).await
    }

    async fn get_chatbot(&self, chatbot_id: &str) -> Result<Option<Chatbot>, ChatwireError> {
        queries::chatbots::get_chatbot(self.db()?, chatbot_id).await
    }

    async fn upsert_chatbot(&self, chatbot: &Chatbot) -> Result<(), ChatwireError> {
        queries::chatbots::upsert_chatbot(self.db()?, chatbot).await
    }

    async fn find_conversation(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<Conversation>, ChatwireError> {
        queries::conversations::find_by_key(self.db()?, key).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ChatwireError> {
        queries::conversations::get_by_id(self.db()?, id).await
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ChatwireError> {
        queries::conversations::create(self.db()?, conversation).await
    }

    async fn update_conversation(&self, update: &ConversationUpdate) -> Result<i64, ChatwireError> {
        queries::conversations::update(self.db()?, update).await
    }

    async fn set_auto_reply_disabled(
        &self,
        conversation_id: &str,
        disabled: bool,
    ) -> Result<(), ChatwireError> {
        queries::conversations::set_auto_reply_disabled(self.db()?, conversation_id, disabled).await
    }

    async fn record_receipt(
        &self,
        message_id: &str,
        channel_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<bool, ChatwireError> {
        queries::receipts::record(self.db()?, message_id, channel_id, received_at).await
    }

    async fn prune_receipts(&self, older_than: DateTime<Utc>) -> Result<usize, ChatwireError> {
        queries::receipts::prune(self.db()?, older_than).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::{ChannelSettings, ConversationState, StoredMessage};
    use tempfile::tempdir;

    fn storage_at(dir: &tempfile::TempDir, file: &str) -> SqliteStorage {
        SqliteStorage::new(StorageConfig {
            database_path: dir.path().join(file).to_string_lossy().into_owned(),
            wal_mode: true,
        })
    }

    #[tokio::test]
    async fn reports_identity() {
        let dir = tempdir().unwrap();
        let storage = storage_at(&dir, "id.db");
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_is_an_error() {
        let dir = tempdir().unwrap();
        let storage = storage_at(&dir, "twice.db");
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let storage = storage_at(&dir, "health.db");
        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let now = Utc::now();
        let key = ConversationKey::whatsapp("bot-1", "5511", "+1 555 0100");
        {
            let storage = storage_at(&dir, "persist.db");
            storage.initialize().await.unwrap();
            storage
                .upsert_channel_binding(&ChannelBinding {
                    channel_id: "pn-1".into(),
                    chatbot_id: "bot-1".into(),
                    display_address: "+1 555 0100".into(),
                    auto_reply_disabled_default: false,
                    settings: ChannelSettings::default(),
                })
                .await
                .unwrap();
            storage
                .create_conversation(&Conversation {
                    id: "c1".into(),
                    key: key.clone(),
                    messages: vec![StoredMessage::user("hi", "5511", now)],
                    disable_auto_reply: false,
                    state: ConversationState::Ai,
                    created_at: now,
                    updated_at: now,
                    version: 1,
                })
                .await
                .unwrap();
            storage.shutdown().await.unwrap();
        }

        let storage = storage_at(&dir, "persist.db");
        storage.initialize().await.unwrap();
        assert!(storage.get_channel_binding("pn-1").await.unwrap().is_some());
        let conv = storage.find_conversation(&key).await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 1);
        storage.close().await.unwrap();
    }
}
