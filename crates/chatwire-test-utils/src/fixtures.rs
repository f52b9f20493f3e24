// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned bindings, chatbots and flows.

use chatwire_core::types::{
    AiSettings, ChannelBinding, ChannelSettings, Chatbot, FlowNode, FlowOption, QuestionFlow,
};

/// Provider phone-number id the harness binds.
pub const CHANNEL_ID: &str = "pn-test";
/// The bound number's display address.
pub const DISPLAY_ADDRESS: &str = "15550001111";
pub const CHATBOT_ID: &str = "bot-test";
/// Default peer sending messages.
pub const PEER: &str = "5511999990000";

pub fn binding() -> ChannelBinding {
    ChannelBinding {
        channel_id: CHANNEL_ID.into(),
        chatbot_id: CHATBOT_ID.into(),
        display_address: DISPLAY_ADDRESS.into(),
        auto_reply_disabled_default: false,
        settings: ChannelSettings::default(),
    }
}

pub fn chatbot(flow: Option<QuestionFlow>) -> Chatbot {
    Chatbot {
        id: CHATBOT_ID.into(),
        name: "Acme Support".into(),
        ai: AiSettings {
            system_prompt: Some("You are Ana, Acme's support assistant.".into()),
            ..AiSettings::default()
        },
        flow,
    }
}

fn option(id: &str, label: &str, target: Option<&str>) -> FlowOption {
    FlowOption {
        id: id.into(),
        label: label.into(),
        target_node_id: target.map(Into::into),
    }
}

/// `start` offers sales (terminal prompt), support (asks a follow-up) and
/// hours (ends the flow without a prompt).
pub fn support_flow() -> QuestionFlow {
    QuestionFlow {
        nodes: vec![
            FlowNode {
                id: "start".into(),
                prompt: "Welcome to Acme! What do you need?".into(),
                options: vec![
                    option("sales", "Sales", Some("sales")),
                    option("support", "Support", Some("support")),
                    option("hours", "Opening hours", None),
                ],
                is_initial: true,
            },
            FlowNode {
                id: "sales".into(),
                prompt: "A sales rep will contact you shortly.".into(),
                options: vec![],
                is_initial: false,
            },
            FlowNode {
                id: "support".into(),
                prompt: "Is this about an existing order?".into(),
                options: vec![
                    option("yes", "Yes", Some("sales")),
                    option("no", "No", Some("start")),
                ],
                is_initial: false,
            },
        ],
        restart_timeout_minutes: 30,
        ai_response_enabled: true,
    }
}
