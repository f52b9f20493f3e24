// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token guard for the operator API.
//!
//! Fail-closed: with no token configured, every operator request gets 401.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// The operator token, if the operator API is enabled.
#[derive(Clone, Default)]
pub struct OperatorAuth {
    pub token: Option<String>,
}

impl OperatorAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn permits(&self, headers: &HeaderMap) -> bool {
        match (self.token.as_deref(), presented_token(headers)) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }
}

impl std::fmt::Debug for OperatorAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAuth")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// The token of an `Authorization: Bearer <token>` header.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_operator(
    State(auth): State<OperatorAuth>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.token.is_none() {
        tracing::warn!(path = %request.uri().path(), "operator API disabled, no server.operator_token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !auth.permits(request.headers()) {
        tracing::debug!(path = %request.uri().path(), "operator request rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn debug_hides_token() {
        let auth = OperatorAuth::new(Some("op-secret".into()));
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("op-secret"));
    }

    #[test]
    fn blank_token_disables_api() {
        assert!(OperatorAuth::new(Some("  ".into())).token.is_none());
    }

    #[test]
    fn only_matching_bearer_is_permitted() {
        let auth = OperatorAuth::new(Some("op-secret".into()));
        assert!(auth.permits(&headers("Bearer op-secret")));
        assert!(!auth.permits(&headers("Bearer other")));
        assert!(!auth.permits(&headers("Basic op-secret")));
        assert!(!auth.permits(&HeaderMap::new()));
    }

    #[test]
    fn no_token_permits_nothing() {
        assert!(!OperatorAuth::default().permits(&headers("Bearer anything")));
    }
}
