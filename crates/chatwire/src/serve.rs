// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatwire serve`: wires storage, adapters, the turn pipeline and the gateway.

use std::sync::Arc;
use std::time::Duration;

use chatwire_agent::shutdown::{drain_turns, install_signal_handler};
use chatwire_agent::{PipelineSettings, TurnPipeline};
use chatwire_config::ChatwireConfig;
use chatwire_core::{ChannelAdapter, ChatwireError, ProviderAdapter, StorageAdapter};
use chatwire_gateway::auth::OperatorAuth;
use chatwire_gateway::{GatewayState, HealthState, PayloadMirror, WebhookSettings, start_server};
use chatwire_openai::OpenAiProvider;
use chatwire_storage::SqliteStorage;
use chatwire_whatsapp::WhatsAppChannel;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// How long in-flight turns may run after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_serve(config: ChatwireConfig) -> Result<(), ChatwireError> {
    init_tracing(&config.server.log_level);

    info!("starting chatwire serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let channel: Arc<dyn ChannelAdapter> = Arc::new(WhatsAppChannel::new(&config.whatsapp)?);

    let provider: Option<Arc<dyn ProviderAdapter>> = match OpenAiProvider::new(&config.ai) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "no completion provider, AI replies will fail");
            None
        }
    };

    if config.whatsapp.app_secret.is_none() {
        warn!("whatsapp.app_secret is not set, webhook signatures are not verified");
    }
    if config.server.operator_token.is_none() {
        warn!("server.operator_token is not set, operator API is disabled");
    }

    let pipeline = Arc::new(TurnPipeline::new(
        Arc::clone(&storage),
        channel,
        provider,
        PipelineSettings::from_config(&config),
    ));

    let mirror = config
        .webhook
        .mirror_url
        .as_deref()
        .map(|url| PayloadMirror::new(url, Duration::from_secs(config.whatsapp.request_timeout_secs)))
        .transpose()?;

    let tracker = TaskTracker::new();
    let state = GatewayState {
        pipeline,
        storage: Arc::clone(&storage),
        webhook: WebhookSettings::from_config(&config),
        mirror,
        auth: OperatorAuth::new(config.server.operator_token.clone()),
        tracker: tracker.clone(),
        health: HealthState::default(),
    };

    let cancel = install_signal_handler();
    let served = start_server(&config.server, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }
    cancel.cancel();

    if !drain_turns(&tracker, DRAIN_TIMEOUT).await {
        warn!("shutting down with turns still in flight");
    }

    if let Err(e) = storage.close().await {
        error!(error = %e, "failed to close storage");
    }
    info!("chatwire stopped");
    served
}

/// `RUST_LOG` wins over `[server] log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatwire={log_level},tower_http={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
