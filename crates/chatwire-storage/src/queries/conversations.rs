// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message history operations.
//!
//! Every write to a conversation row bumps `version`; updates are conditional
//! on the version the caller last read.

use chatwire_core::ChatwireError;
use chatwire_core::types::{
    Conversation, ConversationKey, ConversationState, ConversationUpdate, DeliveryStatus, Role,
    StoredMessage,
};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

use crate::database::{Database, conversion_err, format_ts, json_col, map_tr_err, to_json, ts_col};

const CONVERSATION_COLUMNS: &str = "id, chatbot_id, channel, peer_address, channel_address, \
     disable_auto_reply, state, version, created_at, updated_at";

/// Outcome of a conditional write, decided inside the connection thread.
enum WriteOutcome<T> {
    Done(T),
    Conflict,
    Missing,
}

fn read_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        key: ConversationKey {
            chatbot_id: row.get(1)?,
            channel: row.get(2)?,
            peer_address: row.get(3)?,
            channel_address: row.get(4)?,
        },
        messages: Vec::new(),
        disable_auto_reply: row.get(5)?,
        state: json_col::<ConversationState>(row, 6)?,
        version: row.get(7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

fn load_messages(conn: &Connection, conversation_id: &str) -> rusqlite::Result<Vec<StoredMessage>> {
    let mut stmt = conn.prepare(
        "SELECT role, content, author, delivery, created_at
         FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        let role: String = row.get(0)?;
        let delivery: Option<String> = row.get(3)?;
        Ok(StoredMessage {
            role: role.parse::<Role>().map_err(|e| conversion_err(0, e))?,
            content: row.get(1)?,
            author: row.get(2)?,
            delivery: delivery
                .map(|d| d.parse::<DeliveryStatus>())
                .transpose()
                .map_err(|e| conversion_err(3, e))?,
            timestamp: ts_col(row, 4)?,
        })
    })?;
    rows.collect()
}

fn insert_messages(
    tx: &Transaction<'_>,
    conversation_id: &str,
    messages: &[StoredMessage],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO messages (conversation_id, role, content, author, delivery, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for message in messages {
        stmt.execute(params![
            conversation_id,
            message.role.to_string(),
            message.content,
            message.author,
            message.delivery.map(|d| d.to_string()),
            format_ts(&message.timestamp),
        ])?;
    }
    Ok(())
}

fn with_history(conn: &Connection, conversation: Option<Conversation>) -> rusqlite::Result<Option<Conversation>> {
    match conversation {
        Some(mut conversation) => {
            conversation.messages = load_messages(conn, &conversation.id)?;
            Ok(Some(conversation))
        }
        None => Ok(None),
    }
}

/// Find the conversation for a composite key, with its history.
pub async fn find_by_key(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<Conversation>, ChatwireError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let found = conn
                .query_row(
                    &format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE chatbot_id = ?1 AND channel = ?2
                           AND peer_address = ?3 AND channel_address = ?4"
                    ),
                    params![key.chatbot_id, key.channel, key.peer_address, key.channel_address],
                    read_conversation_row,
                )
                .optional()?;
            with_history(conn, found)
        })
        .await
        .map_err(map_tr_err)
}

/// Load a conversation by id, with its history.
pub async fn get_by_id(db: &Database, id: &str) -> Result<Option<Conversation>, ChatwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let found = conn
                .query_row(
                    &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                    params![id],
                    read_conversation_row,
                )
                .optional()?;
            with_history(conn, found)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a conversation and its initial messages in one transaction.
///
/// Returns [`ChatwireError::Conflict`] when the composite key is already taken.
pub async fn create(db: &Database, conversation: &Conversation) -> Result<(), ChatwireError> {
    let state = to_json(&conversation.state)?;
    let conversation = conversation.clone();
    let lock_key = conversation.key.lock_key();

    let outcome = db
        .connection()
        .call(move |conn| -> Result<WriteOutcome<()>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO conversations
                    (id, chatbot_id, channel, peer_address, channel_address,
                     disable_auto_reply, state, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    conversation.id,
                    conversation.key.chatbot_id,
                    conversation.key.channel,
                    conversation.key.peer_address,
                    conversation.key.channel_address,
                    conversation.disable_auto_reply,
                    state,
                    conversation.version,
                    format_ts(&conversation.created_at),
                    format_ts(&conversation.updated_at),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Ok(WriteOutcome::Conflict);
                }
                Err(e) => return Err(e),
            }
            insert_messages(&tx, &conversation.id, &conversation.messages)?;
            tx.commit()?;
            Ok(WriteOutcome::Done(()))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        WriteOutcome::Done(()) => Ok(()),
        WriteOutcome::Conflict | WriteOutcome::Missing => {
            debug!(conversation = %lock_key, "conversation already exists for key");
            Err(ChatwireError::Conflict {
                message: format!("conversation already exists for {lock_key}"),
            })
        }
    }
}

/// Append messages and set the state if the stored version still matches.
///
/// Returns the new version.
pub async fn update(db: &Database, update: &ConversationUpdate) -> Result<i64, ChatwireError> {
    let state = to_json(&update.state)?;
    let update = update.clone();
    let id = update.conversation_id.clone();
    let expected = update.expected_version;

    let outcome = db
        .connection()
        .call(move |conn| -> Result<WriteOutcome<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE conversations
                 SET state = ?1, updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![
                    state,
                    format_ts(&update.updated_at),
                    update.conversation_id,
                    update.expected_version,
                ],
            )?;
            if changed == 0 {
                let exists = tx
                    .query_row(
                        "SELECT 1 FROM conversations WHERE id = ?1",
                        params![update.conversation_id],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                return Ok(if exists {
                    WriteOutcome::Conflict
                } else {
                    WriteOutcome::Missing
                });
            }
            insert_messages(&tx, &update.conversation_id, &update.append)?;
            tx.commit()?;
            Ok(WriteOutcome::Done(update.expected_version + 1))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        WriteOutcome::Done(version) => Ok(version),
        WriteOutcome::Conflict => Err(ChatwireError::Conflict {
            message: format!("conversation {id} moved past version {expected}"),
        }),
        WriteOutcome::Missing => Err(ChatwireError::not_found("conversation", id)),
    }
}

/// Set the operator takeover flag.
///
/// Bumps the version, so a turn writing concurrently conflicts and re-reads the flag.
pub async fn set_auto_reply_disabled(
    db: &Database,
    id: &str,
    disabled: bool,
) -> Result<(), ChatwireError> {
    let conversation_id = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations
                 SET disable_auto_reply = ?1, version = version + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![disabled, conversation_id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(ChatwireError::not_found("conversation", id));
    }
    Ok(())
}
