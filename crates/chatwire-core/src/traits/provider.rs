// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for AI completion services.

use async_trait::async_trait;

use crate::error::ChatwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for AI completion services.
///
/// The pipeline treats completion as opaque: messages, a system prompt and
/// model parameters in, reply text out.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChatwireError>;
}
