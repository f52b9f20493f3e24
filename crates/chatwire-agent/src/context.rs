// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for AI replies: history windowing, system prompt and
//! model settings.

use chatwire_config::model::{AiConfig, PipelineConfig};
use chatwire_core::types::{
    AiSettings, ChannelBinding, Chatbot, FlowPrompt, ModelConfig, ProviderMessage, Role,
    StoredMessage,
};
use chrono::{DateTime, Duration, Utc};

/// Limits applied to conversation history before it is sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    /// Histories at or below this length are sent whole.
    pub threshold: usize,
    /// Longer histories keep only messages newer than this.
    pub window: Duration,
    /// Kept from the tail when the window selects nothing.
    pub fallback_count: usize,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            threshold: 20,
            window: Duration::minutes(60),
            fallback_count: 10,
        }
    }
}

impl From<&PipelineConfig> for ContextPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.context_message_threshold,
            window: Duration::minutes(config.context_window_minutes),
            fallback_count: config.context_fallback_count,
        }
    }
}

/// Choose the history sent with an AI request.
///
/// `messages` is the history before this turn, so the one-hour window and
/// its last-ten fallback look at earlier turns only. The chosen messages
/// keep their order, and `current` is appended when it is not already the
/// last one. System entries are never forwarded.
pub fn select_context(
    messages: &[StoredMessage],
    current: &StoredMessage,
    now: DateTime<Utc>,
    policy: &ContextPolicy,
) -> Vec<ProviderMessage> {
    let selected: Vec<&StoredMessage> = if messages.len() <= policy.threshold {
        messages.iter().collect()
    } else {
        let cutoff = now - policy.window;
        let recent: Vec<&StoredMessage> = messages.iter().filter(|m| m.timestamp >= cutoff).collect();
        if recent.is_empty() {
            messages[messages.len().saturating_sub(policy.fallback_count)..]
                .iter()
                .collect()
        } else {
            recent
        }
    };

    let mut context: Vec<ProviderMessage> = selected
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| to_provider_message(m))
        .collect();
    if selected.last().copied() != Some(current) {
        context.push(to_provider_message(current));
    }
    context
}

/// Flow prompts are stored as JSON; the model sees their text form.
fn to_provider_message(message: &StoredMessage) -> ProviderMessage {
    let content = match message.role {
        Role::Assistant => FlowPrompt::parse(&message.content)
            .map(|p| p.plain_text())
            .unwrap_or_else(|| message.content.clone()),
        _ => message.content.clone(),
    };
    ProviderMessage {
        role: message.role,
        content,
    }
}

/// Channel override, then the chatbot's prompt, then the configured default.
pub fn resolve_system_prompt(binding: &ChannelBinding, chatbot: &Chatbot, defaults: &AiConfig) -> String {
    [
        binding.settings.system_prompt_override.as_deref(),
        chatbot.ai.system_prompt.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|p| !p.trim().is_empty())
    .unwrap_or(&defaults.default_system_prompt)
    .to_string()
}

/// Per-chatbot settings layered over `[ai]` defaults.
pub fn model_config(settings: &AiSettings, defaults: &AiConfig) -> ModelConfig {
    ModelConfig {
        model: settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.default_model.clone()),
        temperature: settings.temperature.unwrap_or(defaults.temperature),
        max_tokens: settings.max_tokens.unwrap_or(defaults.max_tokens),
        top_p: settings.top_p.unwrap_or(defaults.top_p),
        frequency_penalty: settings.frequency_penalty.unwrap_or(defaults.frequency_penalty),
        presence_penalty: settings.presence_penalty.unwrap_or(defaults.presence_penalty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::{ChannelSettings, DeliveryStatus, FlowPromptOption};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn user(text: &str, minutes_ago: i64) -> StoredMessage {
        StoredMessage::user(text, "5511999", now() - Duration::minutes(minutes_ago))
    }

    fn history(len: usize, minutes_ago: impl Fn(usize) -> i64) -> Vec<StoredMessage> {
        (0..len).map(|i| user(&format!("m{i}"), minutes_ago(i))).collect()
    }

    fn contents(context: &[ProviderMessage]) -> Vec<String> {
        context.iter().map(|m| m.content.clone()).collect()
    }

    #[test]
    fn short_history_is_sent_whole_in_order() {
        let messages = history(20, |i| 500 - i as i64);
        let current = messages[19].clone();
        let context = select_context(&messages, &current, now(), &ContextPolicy::default());
        assert_eq!(contents(&context), (0..20).map(|i| format!("m{i}")).collect::<Vec<_>>());
    }

    #[test]
    fn long_stale_history_falls_back_to_last_ten_plus_current() {
        let messages = history(30, |i| 300 - i as i64);
        let current = user("now", 0);
        let context = select_context(&messages, &current, now(), &ContextPolicy::default());
        let mut expected: Vec<String> = (20..30).map(|i| format!("m{i}")).collect();
        expected.push("now".into());
        assert_eq!(contents(&context), expected);
    }

    #[test]
    fn long_history_keeps_last_hour() {
        // m0..m24 are 2h old; m25..m29 are from the last few minutes.
        let messages = history(30, |i| if i < 25 { 120 } else { 5 });
        let current = messages[29].clone();
        let context = select_context(&messages, &current, now(), &ContextPolicy::default());
        assert_eq!(
            contents(&context),
            (25..30).map(|i| format!("m{i}")).collect::<Vec<_>>()
        );
    }

    #[test]
    fn flow_prompts_are_rendered_as_text() {
        let prompt = FlowPrompt {
            node_id: "start".into(),
            prompt: "Pick one".into(),
            options: vec![FlowPromptOption {
                id: "a".into(),
                label: "Sales".into(),
            }],
        };
        let messages = vec![
            user("hi", 2),
            StoredMessage::assistant(prompt.to_json().unwrap(), "flow", now(), DeliveryStatus::Delivered),
        ];
        let current = user("what now?", 0);
        let context = select_context(&messages, &current, now(), &ContextPolicy::default());
        assert_eq!(context[1].role, Role::Assistant);
        assert_eq!(context[1].content, "Pick one\n1. Sales");
        assert_eq!(context[2].content, "what now?");
    }

    fn binding(override_prompt: Option<&str>) -> ChannelBinding {
        ChannelBinding {
            channel_id: "pn-1".into(),
            chatbot_id: "bot-1".into(),
            display_address: "15550100".into(),
            auto_reply_disabled_default: false,
            settings: ChannelSettings {
                reply_delay_secs: 0,
                system_prompt_override: override_prompt.map(Into::into),
            },
        }
    }

    fn chatbot(prompt: Option<&str>) -> Chatbot {
        Chatbot {
            id: "bot-1".into(),
            name: "Acme".into(),
            ai: AiSettings {
                system_prompt: prompt.map(Into::into),
                temperature: Some(0.1),
                ..AiSettings::default()
            },
            flow: None,
        }
    }

    #[test]
    fn system_prompt_precedence() {
        let defaults = AiConfig::default();
        assert_eq!(
            resolve_system_prompt(&binding(Some("channel")), &chatbot(Some("bot")), &defaults),
            "channel"
        );
        assert_eq!(
            resolve_system_prompt(&binding(Some("  ")), &chatbot(Some("bot")), &defaults),
            "bot"
        );
        assert_eq!(
            resolve_system_prompt(&binding(None), &chatbot(None), &defaults),
            defaults.default_system_prompt
        );
    }

    #[test]
    fn chatbot_settings_override_defaults() {
        let defaults = AiConfig::default();
        let config = model_config(&chatbot(None).ai, &defaults);
        assert_eq!(config.model, defaults.default_model);
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, defaults.max_tokens);
    }

    proptest! {
        #[test]
        fn context_ends_with_current_and_is_bounded(
            ages in proptest::collection::vec(0i64..240, 0..60),
        ) {
            let messages: Vec<StoredMessage> = ages
                .iter()
                .enumerate()
                .map(|(i, age)| user(&format!("m{i}"), *age))
                .collect();
            let current = user("current", 0);
            let policy = ContextPolicy::default();
            let context = select_context(&messages, &current, now(), &policy);

            prop_assert_eq!(context.last().map(|m| m.content.as_str()), Some("current"));
            if messages.len() <= policy.threshold {
                prop_assert_eq!(context.len(), messages.len() + 1);
            } else {
                prop_assert!(context.len() <= messages.len() + 1);
            }
        }
    }
}
