// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! Every check runs; the caller gets the full list of problems at once.

use crate::diagnostic::ConfigError;
use crate::model::ChatwireConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &ChatwireConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::invalid("server.host", "must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::invalid(
            "server.host",
            format!("`{host}` is not an IP address or hostname"),
        ));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::invalid(
            "server.log_level",
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ));
    }

    if matches!(&config.server.operator_token, Some(t) if t.trim().is_empty()) {
        errors.push(ConfigError::invalid(
            "server.operator_token",
            "must not be empty when set",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    if !config.whatsapp.graph_base_url.starts_with("http://")
        && !config.whatsapp.graph_base_url.starts_with("https://")
    {
        errors.push(ConfigError::invalid(
            "whatsapp.graph_base_url",
            "must be an http(s) URL",
        ));
    }
    if config.whatsapp.request_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "whatsapp.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    let ai = &config.ai;
    if !(0.0..=2.0).contains(&ai.temperature) {
        errors.push(ConfigError::invalid(
            "ai.temperature",
            format!("must be between 0 and 2, got {}", ai.temperature),
        ));
    }
    if !(0.0..=1.0).contains(&ai.top_p) {
        errors.push(ConfigError::invalid(
            "ai.top_p",
            format!("must be between 0 and 1, got {}", ai.top_p),
        ));
    }
    for (key, value) in [
        ("ai.frequency_penalty", ai.frequency_penalty),
        ("ai.presence_penalty", ai.presence_penalty),
    ] {
        if !(-2.0..=2.0).contains(&value) {
            errors.push(ConfigError::invalid(
                key,
                format!("must be between -2 and 2, got {value}"),
            ));
        }
    }
    if ai.max_tokens == 0 {
        errors.push(ConfigError::invalid("ai.max_tokens", "must be greater than zero"));
    }
    if ai.timeout_secs == 0 {
        errors.push(ConfigError::invalid("ai.timeout_secs", "must be greater than zero"));
    }
    if ai.default_model.trim().is_empty() {
        errors.push(ConfigError::invalid("ai.default_model", "must not be empty"));
    }

    let pipeline = &config.pipeline;
    if pipeline.context_fallback_count == 0 {
        errors.push(ConfigError::invalid(
            "pipeline.context_fallback_count",
            "must be at least 1",
        ));
    }
    if pipeline.context_window_minutes <= 0 {
        errors.push(ConfigError::invalid(
            "pipeline.context_window_minutes",
            "must be positive",
        ));
    }
    if pipeline.default_restart_timeout_minutes == 0 {
        errors.push(ConfigError::invalid(
            "pipeline.default_restart_timeout_minutes",
            "must be greater than zero",
        ));
    }
    if pipeline.dedup_window_secs < pipeline.max_message_age_secs {
        errors.push(ConfigError::invalid(
            "pipeline.dedup_window_secs",
            "must not be shorter than pipeline.max_message_age_secs",
        ));
    }

    if let Some(url) = &config.webhook.mirror_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ConfigError::invalid("webhook.mirror_url", "must be an http(s) URL"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
