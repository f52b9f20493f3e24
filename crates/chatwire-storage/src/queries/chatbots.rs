// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatbot operations. AI settings and the question flow are JSON columns.

use chatwire_core::ChatwireError;
use chatwire_core::types::{AiSettings, Chatbot, QuestionFlow};
use rusqlite::params;

use crate::database::{Database, conversion_err, json_col, map_tr_err, to_json};

pub async fn get_chatbot(db: &Database, id: &str) -> Result<Option<Chatbot>, ChatwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Chatbot>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT id, name, ai, flow FROM chatbots WHERE id = ?1",
                params![id],
                |row| {
                    let flow: Option<String> = row.get(3)?;
                    let flow = flow
                        .map(|raw| serde_json::from_str::<QuestionFlow>(&raw))
                        .transpose()
                        .map_err(|e| conversion_err(3, e))?;
                    Ok(Chatbot {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        ai: json_col::<AiSettings>(row, 2)?,
                        flow,
                    })
                },
            );
            match result {
                Ok(bot) => Ok(Some(bot)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_chatbot(db: &Database, chatbot: &Chatbot) -> Result<(), ChatwireError> {
    let ai = to_json(&chatbot.ai)?;
    let flow = chatbot.flow.as_ref().map(to_json).transpose()?;
    let id = chatbot.id.clone();
    let name = chatbot.name.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO chatbots (id, name, ai, flow) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    ai = excluded.ai,
                    flow = excluded.flow,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, name, ai, flow],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::{FlowNode, FlowOption};

    fn chatbot_with_flow() -> Chatbot {
        Chatbot {
            id: "bot-1".into(),
            name: "Support".into(),
            ai: AiSettings {
                model: Some("gpt-4o".into()),
                temperature: Some(0.3),
                ..Default::default()
            },
            flow: Some(QuestionFlow {
                nodes: vec![
                    FlowNode {
                        id: "start".into(),
                        prompt: "Hi! Sales or support?".into(),
                        options: vec![FlowOption {
                            id: "sales".into(),
                            label: "Sales".into(),
                            target_node_id: None,
                        }],
                        is_initial: true,
                    },
                ],
                restart_timeout_minutes: 15,
                ai_response_enabled: false,
            }),
        }
    }

    #[tokio::test]
    async fn chatbot_round_trips_with_flow() {
        let db = Database::open_in_memory().await.unwrap();
        let bot = chatbot_with_flow();
        upsert_chatbot(&db, &bot).await.unwrap();
        assert_eq!(get_chatbot(&db, "bot-1").await.unwrap(), Some(bot));
    }

    #[tokio::test]
    async fn upsert_can_remove_flow() {
        let db = Database::open_in_memory().await.unwrap();
        let mut bot = chatbot_with_flow();
        upsert_chatbot(&db, &bot).await.unwrap();
        bot.flow = None;
        upsert_chatbot(&db, &bot).await.unwrap();
        let stored = get_chatbot(&db, "bot-1").await.unwrap().unwrap();
        assert!(stored.flow.is_none());
        assert!(stored.ai_response_enabled());
    }

    #[tokio::test]
    async fn missing_chatbot_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(get_chatbot(&db, "nope").await.unwrap(), None);
    }
}
