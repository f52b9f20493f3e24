// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for Chatwire.
//!
//! Implements [`ProviderAdapter`] over `POST {base_url}/chat/completions`.
//! Any server speaking that API (OpenAI, Azure-style gateways, local
//! inference servers) can back the AI reply path.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use chatwire_config::model::AiConfig;
use chatwire_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, TokenUsage,
};
use chatwire_core::{ChatwireError, PluginAdapter, ProviderAdapter};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest};

/// Environment variable consulted when `[ai] api_key` is unset.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Chat-completions provider.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Build the provider from `[ai]` config.
    ///
    /// API key resolution: `ai.api_key`, then `OPENAI_API_KEY`, else a config error.
    pub fn new(config: &AiConfig) -> Result<Self, ChatwireError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %config.base_url, model = %config.default_model, "completion provider initialized");
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn to_chat_request(request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".into(),
                content: Some(request.system_prompt.clone()),
            });
        }
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: m.role.to_string(),
            content: Some(m.content.clone()),
        }));

        ChatRequest {
            model: request.model.model.clone(),
            messages,
            temperature: request.model.temperature,
            max_tokens: request.model.max_tokens,
            top_p: request.model.top_p,
            frequency_penalty: request.model.frequency_penalty,
            presence_penalty: request.model.presence_penalty,
        }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, ChatwireError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ChatwireError::Config(format!(
            "no completion API key: set ai.api_key or {API_KEY_ENV}"
        ))),
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatwireError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChatwireError> {
        let chat_request = Self::to_chat_request(&request);
        let response = self.client.chat(&chat_request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ChatwireError::Provider {
                message: "completion returned no text".into(),
                source: None,
            });
        }

        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });
        debug!(
            model = %response.model,
            input_tokens = usage.as_ref().map(|u| u.input_tokens),
            output_tokens = usage.as_ref().map(|u| u.output_tokens),
            "completion received"
        );

        Ok(CompletionResponse {
            text,
            model: response.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::{ModelConfig, ProviderMessage, Role};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are Ana from Acme.".into(),
            messages: vec![
                ProviderMessage {
                    role: Role::User,
                    content: "Hi".into(),
                },
                ProviderMessage {
                    role: Role::Assistant,
                    content: "Hello! How can I help?".into(),
                },
                ProviderMessage {
                    role: Role::User,
                    content: "Opening hours?".into(),
                },
            ],
            model: ModelConfig {
                model: "gpt-4o-mini".into(),
                temperature: 0.2,
                max_tokens: 128,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
            },
        }
    }

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::with_client(
            OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5))
                .unwrap()
                .with_retry_delay(Duration::from_millis(10)),
        )
    }

    #[test]
    fn system_prompt_leads_the_message_list() {
        let chat = OpenAiProvider::to_chat_request(&completion_request());
        let roles: Vec<&str> = chat.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(chat.model, "gpt-4o-mini");
        assert_eq!(chat.max_tokens, 128);
    }

    #[test]
    fn configured_key_wins_over_env() {
        assert_eq!(resolve_api_key(Some("sk-config")).unwrap(), "sk-config");
    }

    #[tokio::test]
    async fn complete_returns_trimmed_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 128
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c1",
                "model": "gpt-4o-mini",
                "choices": [{"message": {"role": "assistant", "content": "  9am to 5pm.\n"}}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 4}
            })))
            .mount(&server)
            .await;

        let response = provider(&server).complete(completion_request()).await.unwrap();
        assert_eq!(response.text, "9am to 5pm.");
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                input_tokens: 20,
                output_tokens: 4
            })
        );
    }

    #[tokio::test]
    async fn empty_completion_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(completion_request()).await.unwrap_err();
        assert!(matches!(err, ChatwireError::Provider { .. }));
    }
}
