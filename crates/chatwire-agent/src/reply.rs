// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI completion with an upper bound on latency.

use std::sync::Arc;
use std::time::Duration;

use chatwire_core::types::{CompletionRequest, CompletionResponse};
use chatwire_core::{ChatwireError, ProviderAdapter};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AiReplier {
    provider: Arc<dyn ProviderAdapter>,
    timeout: Duration,
}

impl AiReplier {
    pub fn new(provider: Arc<dyn ProviderAdapter>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Request a completion, failing with [`ChatwireError::Timeout`] past the deadline.
    pub async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse, ChatwireError> {
        let model = request.model.model.clone();
        let messages = request.messages.len();
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => {
                debug!(model = %response.model, chars = response.text.len(), "ai reply generated");
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(model = %model, messages, timeout_secs = self.timeout.as_secs(), "ai completion timed out");
                Err(ChatwireError::Timeout {
                    duration: self.timeout,
                })
            }
        }
    }
}
