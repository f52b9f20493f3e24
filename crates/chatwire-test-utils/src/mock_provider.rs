// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatwire_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, TokenUsage,
};
use chatwire_core::{ChatwireError, PluginAdapter, ProviderAdapter};

/// A mock provider that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue; an `Err` entry fails that call with a
/// provider error. When the queue is empty, `"mock response"` is returned.
/// Every request is captured.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider pre-loaded with the given replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failing call.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.responses.lock().await.push_back(Err(message.into()));
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
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
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ChatwireError> {
        let model = request.model.model.clone();
        self.requests.lock().await.push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()));
        match next {
            Ok(text) => Ok(CompletionResponse {
                text,
                model,
                usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                }),
            }),
            Err(message) => Err(ChatwireError::Provider {
                message,
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::types::ModelConfig;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "sys".into(),
            messages: vec![],
            model: ModelConfig {
                model: "mock-model".into(),
                temperature: 0.0,
                max_tokens: 16,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(provider.complete(request()).await.unwrap().text, "first");
        assert_eq!(provider.complete(request()).await.unwrap().text, "second");
        assert_eq!(provider.complete(request()).await.unwrap().text, "mock response");
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn queued_failure_is_a_provider_error() {
        let provider = MockProvider::new();
        provider.add_failure("boom").await;
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ChatwireError::Provider { .. }));
        assert_eq!(provider.requests().await[0].model.model, "mock-model");
    }
}
