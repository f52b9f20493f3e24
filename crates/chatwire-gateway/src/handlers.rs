// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator API handlers and the health probe.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chatwire_core::ChatwireError;
use chatwire_core::types::{
    AiSettings, ChannelBinding, ChannelSettings, Chatbot, Conversation, HealthStatus, QuestionFlow,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for `PUT /v1/channels/{channel_id}`.
#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub chatbot_id: String,
    pub display_address: String,
    #[serde(default)]
    pub auto_reply_disabled_default: bool,
    #[serde(default)]
    pub settings: ChannelSettings,
}

/// Request body for `PUT /v1/chatbots/{chatbot_id}`.
#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    pub name: String,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub flow: Option<QuestionFlow>,
}

/// Request body for `PUT /v1/conversations/{conversation_id}/auto-reply`.
#[derive(Debug, Deserialize)]
pub struct AutoReplyRequest {
    pub disabled: bool,
}

/// Response body for the health endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// Unauthenticated. Reports "degraded" when storage does not answer.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok"),
        Ok(HealthStatus::Degraded(reason)) => {
            tracing::warn!(reason = %reason, "storage degraded");
            (StatusCode::OK, "degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            tracing::warn!(reason = %reason, "storage unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.health.start_time.elapsed().as_secs(),
        }),
    )
}

/// GET /v1/channels/{channel_id}
pub async fn get_channel(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelBinding>, ApiError> {
    state
        .storage
        .get_channel_binding(&channel_id)
        .await?
        .map(Json)
        .ok_or_else(|| ChatwireError::not_found("channel", channel_id).into())
}

/// PUT /v1/channels/{channel_id}
///
/// Binds the channel to an existing chatbot, replacing any previous binding.
pub async fn put_channel(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
    Json(request): Json<ChannelRequest>,
) -> Result<Json<ChannelBinding>, ApiError> {
    if state.storage.get_chatbot(&request.chatbot_id).await?.is_none() {
        return Err(ChatwireError::not_found("chatbot", request.chatbot_id).into());
    }
    let binding = ChannelBinding {
        channel_id,
        chatbot_id: request.chatbot_id,
        display_address: request.display_address,
        auto_reply_disabled_default: request.auto_reply_disabled_default,
        settings: request.settings,
    };
    state.storage.upsert_channel_binding(&binding).await?;
    tracing::info!(channel_id = %binding.channel_id, chatbot_id = %binding.chatbot_id, "channel bound");
    Ok(Json(binding))
}

/// DELETE /v1/channels/{channel_id}
pub async fn delete_channel(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.storage.delete_channel_binding(&channel_id).await? {
        tracing::info!(channel_id = %channel_id, "channel unbound");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ChatwireError::not_found("channel", channel_id).into())
    }
}

/// GET /v1/chatbots/{chatbot_id}
pub async fn get_chatbot(
    State(state): State<GatewayState>,
    Path(chatbot_id): Path<String>,
) -> Result<Json<Chatbot>, ApiError> {
    state
        .storage
        .get_chatbot(&chatbot_id)
        .await?
        .map(Json)
        .ok_or_else(|| ChatwireError::not_found("chatbot", chatbot_id).into())
}

/// PUT /v1/chatbots/{chatbot_id}
///
/// The flow, if any, is validated before anything is stored.
pub async fn put_chatbot(
    State(state): State<GatewayState>,
    Path(chatbot_id): Path<String>,
    Json(request): Json<ChatbotRequest>,
) -> Result<Json<Chatbot>, ApiError> {
    if let Some(flow) = &request.flow {
        chatwire_flow::validate(flow)?;
    }
    let chatbot = Chatbot {
        id: chatbot_id,
        name: request.name,
        ai: request.ai,
        flow: request.flow,
    };
    state.storage.upsert_chatbot(&chatbot).await?;
    tracing::info!(chatbot_id = %chatbot.id, has_flow = chatbot.flow.is_some(), "chatbot saved");
    Ok(Json(chatbot))
}

/// GET /v1/conversations/{conversation_id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .storage
        .get_conversation(&conversation_id)
        .await?
        .map(Json)
        .ok_or_else(|| ChatwireError::not_found("conversation", conversation_id).into())
}

/// PUT /v1/conversations/{conversation_id}/auto-reply
///
/// Operator takeover: while disabled, inbound messages are recorded but not answered.
pub async fn put_auto_reply(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<AutoReplyRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .storage
        .set_auto_reply_disabled(&conversation_id, request.disabled)
        .await?;
    tracing::info!(conversation_id = %conversation_id, disabled = request.disabled, "auto-reply switched");
    Ok(StatusCode::NO_CONTENT)
}
