// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message receipts for at-most-once processing.

use chatwire_core::ChatwireError;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err};

/// Record a provider message id. Returns `true` only the first time it is seen.
pub async fn record(
    db: &Database,
    message_id: &str,
    channel_id: &str,
    received_at: DateTime<Utc>,
) -> Result<bool, ChatwireError> {
    let message_id = message_id.to_string();
    let channel_id = channel_id.to_string();
    let received_at = format_ts(&received_at);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO inbound_receipts (message_id, channel_id, received_at)
                 VALUES (?1, ?2, ?3)",
                params![message_id, channel_id, received_at],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete receipts received before `older_than`. Returns the number removed.
pub async fn prune(db: &Database, older_than: DateTime<Utc>) -> Result<usize, ChatwireError> {
    let cutoff = format_ts(&older_than);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM inbound_receipts WHERE received_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}
