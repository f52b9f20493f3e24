// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API request bodies for outbound messages.
//!
//! Flow prompts with up to three options go out as reply buttons, up to ten
//! as a list message, and anything larger as numbered plain text.

use chatwire_core::types::{FlowPrompt, OutboundContent};
use serde_json::{Value, json};

pub const MAX_BUTTONS: usize = 3;
pub const MAX_LIST_ROWS: usize = 10;

const BUTTON_TITLE_LIMIT: usize = 20;
const ROW_TITLE_LIMIT: usize = 24;
const INTERACTIVE_BODY_LIMIT: usize = 1024;
const TEXT_BODY_LIMIT: usize = 4096;
const LIST_BUTTON_LABEL: &str = "Options";

/// Build the `/messages` request body for `content` addressed to `to`.
pub fn message_body(to: &str, content: &OutboundContent) -> Value {
    match content {
        OutboundContent::Text(text) => text_body(to, text),
        OutboundContent::Flow(prompt) => match prompt.options.len() {
            1..=MAX_BUTTONS => buttons_body(to, prompt),
            n if n <= MAX_LIST_ROWS && n > MAX_BUTTONS => list_body(to, prompt),
            _ => text_body(to, &prompt.plain_text()),
        },
    }
}

/// Body of a read receipt for `message_id`.
pub fn read_receipt_body(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "status": "read",
        "message_id": message_id,
    })
}

fn text_body(to: &str, text: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "text",
        "text": {
            "preview_url": false,
            "body": truncate(text, TEXT_BODY_LIMIT),
        },
    })
}

fn buttons_body(to: &str, prompt: &FlowPrompt) -> Value {
    let buttons: Vec<Value> = prompt
        .options
        .iter()
        .map(|o| {
            json!({
                "type": "reply",
                "reply": {"id": o.id, "title": truncate(&o.label, BUTTON_TITLE_LIMIT)},
            })
        })
        .collect();
    interactive(
        to,
        json!({
            "type": "button",
            "body": {"text": truncate(&prompt.prompt, INTERACTIVE_BODY_LIMIT)},
            "action": {"buttons": buttons},
        }),
    )
}

fn list_body(to: &str, prompt: &FlowPrompt) -> Value {
    let rows: Vec<Value> = prompt
        .options
        .iter()
        .map(|o| json!({"id": o.id, "title": truncate(&o.label, ROW_TITLE_LIMIT)}))
        .collect();
    interactive(
        to,
        json!({
            "type": "list",
            "body": {"text": truncate(&prompt.prompt, INTERACTIVE_BODY_LIMIT)},
            "action": {
                "button": LIST_BUTTON_LABEL,
                "sections": [{"title": LIST_BUTTON_LABEL, "rows": rows}],
            },
        }),
    )
}

fn interactive(to: &str, interactive: Value) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "interactive",
        "interactive": interactive,
    })
}

/// Cut `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::FlowPromptOption;

    fn prompt(n: usize) -> FlowPrompt {
        FlowPrompt {
            node_id: "start".into(),
            prompt: "Pick one".into(),
            options: (1..=n)
                .map(|i| FlowPromptOption {
                    id: format!("opt-{i}"),
                    label: format!("Option number {i} with a long label"),
                })
                .collect(),
        }
    }

    #[test]
    fn text_reply_disables_link_preview() {
        let body = message_body("5511999", &OutboundContent::Text("hi".into()));
        assert_eq!(body["type"], "text");
        assert_eq!(body["to"], "5511999");
        assert_eq!(body["text"]["body"], "hi");
        assert_eq!(body["text"]["preview_url"], false);
    }

    #[test]
    fn up_to_three_options_render_as_buttons() {
        let body = message_body("1", &OutboundContent::Flow(prompt(3)));
        assert_eq!(body["interactive"]["type"], "button");
        let buttons = body["interactive"]["action"]["buttons"].as_array().unwrap();
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons[0]["reply"]["id"], "opt-1");
        assert_eq!(
            buttons[0]["reply"]["title"].as_str().unwrap().chars().count(),
            BUTTON_TITLE_LIMIT
        );
    }

    #[test]
    fn four_to_ten_options_render_as_list() {
        let body = message_body("1", &OutboundContent::Flow(prompt(7)));
        assert_eq!(body["interactive"]["type"], "list");
        let rows = body["interactive"]["action"]["sections"][0]["rows"]
            .as_array()
            .unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[6]["id"], "opt-7");
        assert!(rows[0]["title"].as_str().unwrap().chars().count() <= ROW_TITLE_LIMIT);
    }

    #[test]
    fn large_or_empty_option_sets_fall_back_to_numbered_text() {
        let body = message_body("1", &OutboundContent::Flow(prompt(11)));
        assert_eq!(body["type"], "text");
        let text = body["text"]["body"].as_str().unwrap();
        assert!(text.starts_with("Pick one\n1. Option number 1"));
        assert!(text.contains("\n11. "));

        let body = message_body("1", &OutboundContent::Flow(prompt(0)));
        assert_eq!(body["text"]["body"], "Pick one");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("ok", 20), "ok");
    }

    #[test]
    fn read_receipt_shape() {
        let body = read_receipt_body("wamid.1");
        assert_eq!(body["status"], "read");
        assert_eq!(body["message_id"], "wamid.1");
    }
}
