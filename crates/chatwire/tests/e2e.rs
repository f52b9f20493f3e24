// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: WhatsApp deliveries posted to the gateway, through the
//! turn pipeline, into storage and the mock channel.
//!
//! Each test builds an isolated TestHarness (temp SQLite, mock adapters) and
//! drives it over HTTP. Tests are independent and order-insensitive.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chatwire_core::types::{
    ConversationState, ConversationUpdate, DeliveryStatus, FlowPrompt, OutboundContent, Role,
};
use chatwire_gateway::auth::OperatorAuth;
use chatwire_gateway::{GatewayState, HealthState, WebhookSettings, router};
use chatwire_test_utils::TestHarness;
use chatwire_test_utils::fixtures::{self, CHANNEL_ID, CHATBOT_ID, DISPLAY_ADDRESS, PEER};
use chatwire_whatsapp::signature::{SIGNATURE_HEADER, sign};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

const APP_SECRET: &str = "e2e-app-secret";

/// A harness fronted by the gateway router, with signature checks on.
struct Service {
    harness: TestHarness,
    state: GatewayState,
    seq: std::sync::atomic::AtomicUsize,
}

impl Service {
    async fn start(harness: TestHarness) -> Self {
        let state = GatewayState {
            pipeline: harness.pipeline.clone(),
            storage: harness.storage.clone(),
            webhook: WebhookSettings {
                app_secret: Some(APP_SECRET.into()),
                verify_token: Some("e2e-verify".into()),
                process_inline: true,
            },
            mirror: None,
            auth: OperatorAuth::new(Some("e2e-operator".into())),
            tracker: TaskTracker::new(),
            health: HealthState::default(),
        };
        Self {
            harness,
            state,
            seq: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn next_id(&self) -> String {
        let n = self.seq.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("wamid.e2e.{n}")
    }

    /// Post a signed delivery and return the acknowledgement status.
    async fn post(&self, message: Value) -> String {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-e2e",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": DISPLAY_ADDRESS,
                            "phone_number_id": CHANNEL_ID
                        },
                        "contacts": [{"profile": {"name": "Maria"}, "wa_id": PEER}],
                        "messages": [message]
                    }
                }]
            }]
        })
        .to_string();
        let signature = sign(APP_SECRET, body.as_bytes());
        let request = Request::post("/webhooks/whatsapp")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let ack: Value = serde_json::from_slice(&bytes).unwrap();
        ack["status"].as_str().unwrap().to_string()
    }

    async fn text_at(&self, text: &str, originated: chrono::DateTime<Utc>) -> String {
        self.post(json!({
            "from": PEER,
            "id": self.next_id(),
            "timestamp": originated.timestamp().to_string(),
            "type": "text",
            "text": {"body": text}
        }))
        .await
    }

    async fn text(&self, text: &str) -> String {
        self.text_at(text, Utc::now()).await
    }

    async fn button(&self, id: &str, title: &str) -> String {
        self.post(json!({
            "from": PEER,
            "id": self.next_id(),
            "timestamp": Utc::now().timestamp().to_string(),
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": {"id": id, "title": title}
            }
        }))
        .await
    }

    async fn last_sent(&self) -> OutboundContent {
        self.harness
            .mock_channel
            .sent_messages()
            .await
            .last()
            .map(|m| m.content.clone())
            .unwrap()
    }

    async fn sent_count(&self) -> usize {
        self.harness.mock_channel.sent_count().await
    }
}

async fn ai_only(responses: Vec<&str>) -> Service {
    let harness = TestHarness::builder()
        .with_mock_responses(responses.into_iter().map(String::from).collect())
        .build()
        .await
        .unwrap();
    harness.register(&fixtures::chatbot(None)).await.unwrap();
    Service::start(harness).await
}

async fn with_flow() -> Service {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["AI answer".into()])
        .build()
        .await
        .unwrap();
    harness
        .register(&fixtures::chatbot(Some(fixtures::support_flow())))
        .await
        .unwrap();
    Service::start(harness).await
}

fn prompt_of(content: &OutboundContent) -> &FlowPrompt {
    match content {
        OutboundContent::Flow(prompt) => prompt,
        other => panic!("expected a flow prompt, got {other:?}"),
    }
}

// ---- Staleness ----

#[tokio::test]
async fn stale_delivery_is_acknowledged_without_reply() {
    let service = ai_only(vec!["never sent"]).await;

    let status = service.text_at("hello?", Utc::now() - Duration::seconds(120)).await;
    assert_eq!(status, "NO");
    assert_eq!(service.sent_count().await, 0);
    assert!(service.harness.conversation(CHATBOT_ID).await.unwrap().is_none());
}

// ---- Question flow ----

#[tokio::test]
async fn new_conversation_gets_initial_prompt_verbatim() {
    let service = with_flow().await;

    assert_eq!(service.text("hi").await, "OK");
    let content = service.last_sent().await;
    let prompt = prompt_of(&content);
    assert_eq!(prompt.node_id, "start");
    assert_eq!(prompt.prompt, "Welcome to Acme! What do you need?");
    let labels: Vec<&str> = prompt.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, ["Sales", "Support", "Opening hours"]);

    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    assert_eq!(
        conversation.state,
        ConversationState::Flow {
            node_id: "start".into()
        }
    );
}

#[tokio::test]
async fn stored_flow_prompt_matches_what_was_sent() {
    let service = with_flow().await;
    service.text("hi").await;

    let sent = service.last_sent().await;
    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    let stored = conversation.messages.last().unwrap();
    assert_eq!(stored.role, Role::Assistant);
    assert_eq!(stored.delivery, Some(DeliveryStatus::Delivered));
    assert_eq!(FlowPrompt::parse(&stored.content).as_ref(), Some(prompt_of(&sent)));
}

#[tokio::test]
async fn terminal_node_then_ai_takes_over() {
    let service = with_flow().await;

    service.text("hi").await;
    assert_eq!(service.button("sales", "Sales").await, "OK");
    let content = service.last_sent().await;
    let prompt = prompt_of(&content);
    assert_eq!(prompt.node_id, "sales");
    assert!(prompt.options.is_empty());

    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    assert_eq!(conversation.state, ConversationState::Ai);

    assert_eq!(service.text("when exactly?").await, "OK");
    assert_eq!(
        service.last_sent().await,
        OutboundContent::Text("AI answer".into())
    );
    assert_eq!(service.harness.mock_provider.call_count().await, 1);
}

#[tokio::test]
async fn inactivity_restarts_flow_after_plain_text() {
    let service = with_flow().await;

    service.text("hi").await;
    service.button("sales", "Sales").await;
    service.text("thanks").await;
    assert_eq!(
        service.last_sent().await,
        OutboundContent::Text("AI answer".into())
    );

    // Push the last activity 31 minutes into the past.
    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    service
        .harness
        .storage
        .update_conversation(&ConversationUpdate {
            conversation_id: conversation.id.clone(),
            expected_version: conversation.version,
            append: vec![],
            state: conversation.state.clone(),
            updated_at: Utc::now() - Duration::minutes(31),
        })
        .await
        .unwrap();

    assert_eq!(service.text("back again").await, "OK");
    let content = service.last_sent().await;
    assert_eq!(prompt_of(&content).node_id, "start");
    assert_eq!(service.harness.mock_provider.call_count().await, 1);
}

// ---- Auto-reply switch ----

#[tokio::test]
async fn muted_conversation_gets_no_replies() {
    let service = with_flow().await;

    service.text("hi").await;
    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    service
        .harness
        .storage
        .set_auto_reply_disabled(&conversation.id, true)
        .await
        .unwrap();
    let before = service.sent_count().await;

    assert_eq!(service.button("support", "Support").await, "OK");
    assert_eq!(service.text("hello?").await, "OK");
    assert_eq!(service.sent_count().await, before);

    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    let users = conversation.messages.iter().filter(|m| m.role == Role::User).count();
    assert_eq!(users, 3);
}

#[tokio::test]
async fn channel_default_mutes_new_conversations() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut binding = fixtures::binding();
    binding.auto_reply_disabled_default = true;
    harness
        .register_with(&fixtures::chatbot(None), binding)
        .await
        .unwrap();
    let service = Service::start(harness).await;

    assert_eq!(service.text("hi").await, "OK");
    assert_eq!(service.sent_count().await, 0);
    assert_eq!(service.harness.mock_provider.call_count().await, 0);
}

// ---- AI context ----

#[tokio::test]
async fn short_history_is_sent_to_the_model_in_order() {
    let service = ai_only(vec!["one", "two", "three"]).await;

    service.text("first").await;
    service.text("second").await;
    service.text("third").await;

    let requests = service.harness.mock_provider.requests().await;
    let last = requests.last().unwrap();
    let contents: Vec<&str> = last.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["first", "one", "second", "two", "third"]);
    assert_eq!(
        last.system_prompt,
        "You are Ana, Acme's support assistant."
    );
}

// ---- Deduplication and routing ----

#[tokio::test]
async fn redelivered_message_is_handled_once() {
    let service = ai_only(vec!["only once"]).await;
    let message = json!({
        "from": PEER,
        "id": "wamid.e2e.same",
        "timestamp": Utc::now().timestamp().to_string(),
        "type": "text",
        "text": {"body": "hi"}
    });

    assert_eq!(service.post(message.clone()).await, "OK");
    assert_eq!(service.post(message).await, "OK");
    assert_eq!(service.sent_count().await, 1);

    let conversation = service.harness.conversation(CHATBOT_ID).await.unwrap().unwrap();
    assert_eq!(conversation.messages.len(), 2);
}

#[tokio::test]
async fn unregistered_channel_is_acknowledged_no() {
    let harness = TestHarness::builder().build().await.unwrap();
    let service = Service::start(harness).await;

    assert_eq!(service.text("hi").await, "NO");
    assert_eq!(service.sent_count().await, 0);
}

#[tokio::test]
async fn provider_failure_is_acknowledged_no_and_nothing_sent() {
    let service = ai_only(vec![]).await;
    service.harness.mock_provider.add_failure("upstream down").await;

    assert_eq!(service.text("hi").await, "NO");
    assert_eq!(service.sent_count().await, 0);
}
