// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway router and server lifecycle.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, put},
};
use chatwire_agent::TurnPipeline;
use chatwire_config::model::{ChatwireConfig, ServerConfig};
use chatwire_core::{ChatwireError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{OperatorAuth, require_operator};
use crate::handlers;
use crate::mirror::PayloadMirror;
use crate::webhook;

/// WhatsApp webhook settings.
#[derive(Clone, Default)]
pub struct WebhookSettings {
    /// Verifies `X-Hub-Signature-256` when set.
    pub app_secret: Option<String>,
    /// Token expected by the subscription handshake.
    pub verify_token: Option<String>,
    /// Handle turns before answering the delivery instead of in the background.
    pub process_inline: bool,
}

impl WebhookSettings {
    pub fn from_config(config: &ChatwireConfig) -> Self {
        Self {
            app_secret: config.whatsapp.app_secret.clone().filter(|s| !s.is_empty()),
            verify_token: config.whatsapp.verify_token.clone().filter(|s| !s.is_empty()),
            process_inline: config.webhook.process_inline,
        }
    }
}

impl std::fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("process_inline", &self.process_inline)
            .finish()
    }
}

/// Uptime tracking for the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

/// Shared state for all gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<TurnPipeline>,
    pub storage: Arc<dyn StorageAdapter>,
    pub webhook: WebhookSettings,
    pub mirror: Option<PayloadMirror>,
    pub auth: OperatorAuth,
    /// Turns and mirror posts still running after their delivery was answered.
    pub tracker: TaskTracker,
    pub health: HealthState,
}

/// Build the gateway router.
///
/// `/health` and `/webhooks/whatsapp` are public; `/v1/*` requires the
/// operator bearer token.
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhooks/whatsapp",
            get(webhook::verify_subscription).post(webhook::receive),
        )
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/channels/{channel_id}",
            get(handlers::get_channel)
                .put(handlers::put_channel)
                .delete(handlers::delete_channel),
        )
        .route(
            "/v1/chatbots/{chatbot_id}",
            get(handlers::get_chatbot).put(handlers::put_chatbot),
        )
        .route(
            "/v1/conversations/{conversation_id}",
            get(handlers::get_conversation),
        )
        .route(
            "/v1/conversations/{conversation_id}/auto-reply",
            put(handlers::put_auto_reply),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            require_operator,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Bind and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ChatwireError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatwireError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ChatwireError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
