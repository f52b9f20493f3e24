// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort forwarding of raw webhook payloads to a secondary endpoint.

use std::time::Duration;

use axum::body::Bytes;
use chatwire_core::ChatwireError;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Posts each accepted webhook body, unchanged, to `url`.
#[derive(Debug, Clone)]
pub struct PayloadMirror {
    client: reqwest::Client,
    url: String,
}

impl PayloadMirror {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ChatwireError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatwireError::Channel {
                message: format!("failed to build mirror HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `body` in the background. Failures are logged and never reach the caller.
    pub fn forward(&self, tracker: &TaskTracker, body: Bytes) {
        let client = self.client.clone();
        let url = self.url.clone();
        tracker.spawn(async move {
            let result = client
                .post(&url)
                .header("content-type", "application/json")
                .body(body.to_vec())
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %url, "webhook payload mirrored");
                }
                Ok(response) => {
                    warn!(url = %url, status = %response.status(), "mirror endpoint rejected payload");
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "failed to mirror webhook payload");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn forwards_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mirror"))
            .and(body_string(r#"{"object":"whatsapp_business_account"}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mirror = PayloadMirror::new(&format!("{}/mirror", server.uri()), Duration::from_secs(5)).unwrap();
        let tracker = TaskTracker::new();
        mirror.forward(
            &tracker,
            Bytes::from_static(br#"{"object":"whatsapp_business_account"}"#),
        );
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn unreachable_mirror_does_not_panic() {
        let mirror = PayloadMirror::new("http://127.0.0.1:9/unreachable", Duration::from_millis(200)).unwrap();
        let tracker = TaskTracker::new();
        mirror.forward(&tracker, Bytes::from_static(b"{}"));
        tracker.close();
        tracker.wait().await;
    }
}
