// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON error responses for the operator API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatwire_core::ChatwireError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`ChatwireError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ChatwireError);

impl From<ChatwireError> for ApiError {
    fn from(e: ChatwireError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ChatwireError::NotFound { .. } => StatusCode::NOT_FOUND,
            ChatwireError::InvalidFlow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatwireError::Conflict { .. } => StatusCode::CONFLICT,
            ChatwireError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "operator request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
