// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel binding operations.

use chatwire_core::ChatwireError;
use chatwire_core::types::{ChannelBinding, ChannelSettings};
use rusqlite::params;

use crate::database::{Database, json_col, map_tr_err, to_json};

/// Look up the binding for a provider channel id.
pub async fn get_binding(
    db: &Database,
    channel_id: &str,
) -> Result<Option<ChannelBinding>, ChatwireError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChannelBinding>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT channel_id, chatbot_id, display_address, auto_reply_disabled_default, settings
                 FROM channel_bindings WHERE channel_id = ?1",
                params![channel_id],
                |row| {
                    Ok(ChannelBinding {
                        channel_id: row.get(0)?,
                        chatbot_id: row.get(1)?,
                        display_address: row.get(2)?,
                        auto_reply_disabled_default: row.get(3)?,
                        settings: json_col::<ChannelSettings>(row, 4)?,
                    })
                },
            );
            match result {
                Ok(binding) => Ok(Some(binding)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a binding.
pub async fn upsert_binding(db: &Database, binding: &ChannelBinding) -> Result<(), ChatwireError> {
    let settings = to_json(&binding.settings)?;
    let binding = binding.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO channel_bindings
                    (channel_id, chatbot_id, display_address, auto_reply_disabled_default, settings)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(channel_id) DO UPDATE SET
                    chatbot_id = excluded.chatbot_id,
                    display_address = excluded.display_address,
                    auto_reply_disabled_default = excluded.auto_reply_disabled_default,
                    settings = excluded.settings,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    binding.channel_id,
                    binding.chatbot_id,
                    binding.display_address,
                    binding.auto_reply_disabled_default,
                    settings,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a binding. Returns whether a row was removed.
pub async fn delete_binding(db: &Database, channel_id: &str) -> Result<bool, ChatwireError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM channel_bindings WHERE channel_id = ?1",
                params![channel_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}
