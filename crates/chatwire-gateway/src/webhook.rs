// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp webhook endpoints.
//!
//! `GET` answers the subscription handshake. `POST` receives deliveries: the
//! signature is checked against the raw body, the payload is mirrored and
//! normalized, and each message goes through the turn pipeline. A delivery is
//! answered `{"status": "OK"}` when it carried messages and every one was
//! accepted, otherwise `{"status": "NO"}`. Both are sent with 200 so the
//! provider does not redeliver.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chatwire_agent::TurnOutcome;
use chatwire_core::types::InboundMessage;
use chatwire_whatsapp::signature::SIGNATURE_HEADER;
use chatwire_whatsapp::{WebhookPayload, normalize, verify_signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ErrorResponse;
use crate::server::GatewayState;

/// Query of the subscription handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Acknowledgement body for a delivery.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryAck {
    pub status: String,
}

impl DeliveryAck {
    fn ok(accepted: bool) -> Self {
        Self {
            status: if accepted { "OK" } else { "NO" }.to_string(),
        }
    }
}

/// GET /webhooks/whatsapp
pub async fn verify_subscription(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let expected = state.webhook.verify_token.as_deref().unwrap_or_default();
    match chatwire_whatsapp::webhook::verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        expected,
    ) {
        Some(challenge) => {
            info!("webhook subscription verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            warn!(mode = ?params.mode, "webhook subscription rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /webhooks/whatsapp
pub async fn receive(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = state.webhook.app_secret.as_deref() {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if !verify_signature(secret, signature, &body) {
            warn!("webhook signature mismatch");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "invalid signature".into(),
                }),
            )
                .into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "webhook body is not a delivery payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("invalid payload: {e}"),
                }),
            )
                .into_response();
        }
    };

    if let Some(mirror) = &state.mirror {
        mirror.forward(&state.tracker, body.clone());
    }

    let messages = normalize(&payload);
    if messages.is_empty() {
        debug!("delivery carried no supported messages");
        return (StatusCode::OK, Json(DeliveryAck::ok(false))).into_response();
    }

    let accepted = if state.webhook.process_inline {
        handle_inline(&state, messages).await
    } else {
        handle_in_background(&state, messages);
        true
    };
    (StatusCode::OK, Json(DeliveryAck::ok(accepted))).into_response()
}

/// Messages of one delivery are handled in order.
async fn handle_inline(state: &GatewayState, messages: Vec<InboundMessage>) -> bool {
    let mut accepted = true;
    for message in messages {
        let outcome: TurnOutcome = state.pipeline.handle(message).await;
        accepted &= outcome.accepted();
    }
    accepted
}

fn handle_in_background(state: &GatewayState, messages: Vec<InboundMessage>) {
    let pipeline = state.pipeline.clone();
    state.tracker.spawn(async move {
        for message in messages {
            pipeline.handle(message).await;
        }
    });
}
