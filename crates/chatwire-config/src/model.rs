// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatwire pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chatwire_core::types::UnmatchedInputPolicy;
use serde::{Deserialize, Serialize};

/// Top-level Chatwire configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatwireConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// AI completion defaults and credentials.
    #[serde(default)]
    pub ai: AiConfig,

    /// Inbound turn pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Webhook ingress behaviour.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// HTTP listener and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token for the operator endpoints. `None` disables them (fail-closed).
    #[serde(default)]
    pub operator_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            operator_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatwire").join("chatwire.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatwire.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// System-user access token for the Cloud API.
    #[serde(default)]
    pub access_token: Option<String>,

    /// App secret used to verify `X-Hub-Signature-256`. `None` skips verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token expected in the webhook subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API version segment, e.g. `v21.0`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Graph API base URL.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Mark accepted inbound messages as read.
    #[serde(default = "default_mark_read")]
    pub mark_read: bool,

    /// HTTP timeout for Cloud API calls, in seconds.
    #[serde(default = "default_whatsapp_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            app_secret: None,
            verify_token: None,
            api_version: default_api_version(),
            graph_base_url: default_graph_base_url(),
            mark_read: default_mark_read(),
            request_timeout_secs: default_whatsapp_timeout_secs(),
        }
    }
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_mark_read() -> bool {
    true
}

fn default_whatsapp_timeout_secs() -> u64 {
    15
}

/// AI completion configuration. Per-chatbot settings override these defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// API key for the completion service. `None` requires the `OPENAI_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    /// Model used when a chatbot does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    /// System prompt used when neither the channel nor the chatbot sets one.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Upper bound on one completion call, in seconds.
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            default_system_prompt: default_system_prompt(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_top_p() -> f32 {
    1.0
}

fn default_system_prompt() -> String {
    "You are a helpful assistant answering customers on WhatsApp. Keep replies short.".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    30
}

/// Inbound turn pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Messages that originated longer ago than this are ignored.
    #[serde(default = "default_max_message_age_secs")]
    pub max_message_age_secs: u64,

    /// How long seen message ids are remembered for de-duplication.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Continuity timeout for chatbots whose flow does not set one.
    #[serde(default = "default_restart_timeout_minutes")]
    pub default_restart_timeout_minutes: u32,

    /// Conversations longer than this are windowed before calling the AI.
    #[serde(default = "default_context_message_threshold")]
    pub context_message_threshold: usize,

    /// Recency window applied to long conversations, in minutes.
    #[serde(default = "default_context_window_minutes")]
    pub context_window_minutes: i64,

    /// Messages kept when the recency window selects nothing.
    #[serde(default = "default_context_fallback_count")]
    pub context_fallback_count: usize,

    /// Handling of input that matches no option of the current flow node.
    #[serde(default)]
    pub unmatched_input: UnmatchedInputPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_message_age_secs: default_max_message_age_secs(),
            dedup_window_secs: default_dedup_window_secs(),
            default_restart_timeout_minutes: default_restart_timeout_minutes(),
            context_message_threshold: default_context_message_threshold(),
            context_window_minutes: default_context_window_minutes(),
            context_fallback_count: default_context_fallback_count(),
            unmatched_input: UnmatchedInputPolicy::default(),
        }
    }
}

fn default_max_message_age_secs() -> u64 {
    60
}

fn default_dedup_window_secs() -> u64 {
    24 * 60 * 60
}

fn default_restart_timeout_minutes() -> u32 {
    30
}

fn default_context_message_threshold() -> usize {
    20
}

fn default_context_window_minutes() -> i64 {
    60
}

fn default_context_fallback_count() -> usize {
    10
}

/// Webhook ingress configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Raw payloads are mirrored here, best-effort. `None` disables mirroring.
    #[serde(default)]
    pub mirror_url: Option<String>,

    /// Process the turn before answering the webhook (`false` answers first).
    #[serde(default = "default_process_inline")]
    pub process_inline: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            mirror_url: None,
            process_inline: default_process_inline(),
        }
    }
}

fn default_process_inline() -> bool {
    true
}
