// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound turn pipeline.
//!
//! One normalized message goes through: staleness and duplicate checks,
//! channel and chatbot resolution, conversation continuity, the auto-reply
//! switch, then either the question flow or the AI, and finally dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chatwire_config::model::{AiConfig, ChatwireConfig};
use chatwire_core::types::{
    ChannelBinding, Chatbot, CompletionRequest, Conversation, ConversationKey, ConversationState,
    InboundMessage, OutboundContent, QuestionFlow, StoredMessage, UnmatchedInputPolicy,
};
use chatwire_core::{ChannelAdapter, ChatwireError, ProviderAdapter, StorageAdapter};
use chatwire_flow::{FlowEngine, FlowStep, validate as validate_flow};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::context::{ContextPolicy, model_config, resolve_system_prompt, select_context};
use crate::conversation::{ConversationStore, ConversationTurn};
use crate::dispatch::{BOT_AUTHOR, Dispatcher, FLOW_AUTHOR};
use crate::guard::is_too_old;
use crate::locks::KeyedLocks;
use crate::outcome::{ReplySource, TurnOutcome};
use crate::reply::AiReplier;

/// Receipts are pruned at most this often.
const PRUNE_INTERVAL_SECS: i64 = 60 * 60;

/// Pipeline tuning, resolved from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_message_age: Duration,
    pub dedup_window: Duration,
    pub default_restart_timeout_minutes: u32,
    pub context: ContextPolicy,
    pub unmatched_input: UnmatchedInputPolicy,
    pub ai: AiConfig,
    pub mark_read: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &ChatwireConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            max_message_age: Duration::from_secs(pipeline.max_message_age_secs),
            dedup_window: Duration::from_secs(pipeline.dedup_window_secs),
            default_restart_timeout_minutes: pipeline.default_restart_timeout_minutes,
            context: ContextPolicy::from(pipeline),
            unmatched_input: pipeline.unmatched_input,
            ai: config.ai.clone(),
            mark_read: config.whatsapp.mark_read,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ChatwireConfig::default())
    }
}

/// Handles normalized inbound messages end to end.
pub struct TurnPipeline {
    storage: Arc<dyn StorageAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    replier: Option<AiReplier>,
    conversations: ConversationStore,
    dispatcher: Dispatcher,
    flow: FlowEngine,
    locks: KeyedLocks,
    settings: PipelineSettings,
    last_prune: AtomicI64,
}

/// What is known about the turn so far, for failure logs.
#[derive(Debug, Default)]
struct TurnTrace {
    chatbot_id: Option<String>,
    conversation_id: Option<String>,
}

/// Inputs shared by the reply paths of one turn.
struct TurnContext<'a> {
    inbound: &'a InboundMessage,
    binding: &'a ChannelBinding,
    chatbot: &'a Chatbot,
    user_message: &'a StoredMessage,
    now: DateTime<Utc>,
}

impl TurnPipeline {
    /// Build a pipeline. Without a provider, turns that need the AI fail.
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        settings: PipelineSettings,
    ) -> Self {
        let replier = provider
            .map(|p| AiReplier::new(p, Duration::from_secs(settings.ai.timeout_secs)));
        Self {
            conversations: ConversationStore::new(
                Arc::clone(&storage),
                settings.default_restart_timeout_minutes,
            ),
            dispatcher: Dispatcher::new(Arc::clone(&channel)),
            flow: FlowEngine::new(settings.unmatched_input),
            storage,
            channel,
            replier,
            locks: KeyedLocks::new(),
            settings,
            last_prune: AtomicI64::new(0),
        }
    }

    /// Handle one message at the current time.
    pub async fn handle(&self, inbound: InboundMessage) -> TurnOutcome {
        self.handle_at(inbound, Utc::now()).await
    }

    /// Handle one message as of `now`. Never fails: errors become
    /// [`TurnOutcome::Failed`].
    pub async fn handle_at(&self, inbound: InboundMessage, now: DateTime<Utc>) -> TurnOutcome {
        let mut trace = TurnTrace::default();
        let outcome = match self.process(&inbound, now, &mut trace).await {
            Ok(outcome) => outcome,
            Err(e) => TurnOutcome::Failed {
                reason: e.to_string(),
            },
        };

        let chatbot_id = trace.chatbot_id.as_deref().unwrap_or("-");
        let conversation_id = trace.conversation_id.as_deref().unwrap_or("-");
        match &outcome {
            TurnOutcome::Failed { reason } => error!(
                message_id = %inbound.message_id,
                chatbot_id,
                conversation_id,
                reason = %reason,
                "turn failed"
            ),
            other => info!(
                message_id = %inbound.message_id,
                chatbot_id,
                conversation_id,
                outcome = %other.report().message,
                "turn handled"
            ),
        }
        outcome
    }

    async fn process(
        &self,
        inbound: &InboundMessage,
        now: DateTime<Utc>,
        trace: &mut TurnTrace,
    ) -> Result<TurnOutcome, ChatwireError> {
        if is_too_old(inbound.timestamp, now, self.settings.max_message_age) {
            debug!(
                message_id = %inbound.message_id,
                age_secs = now.timestamp() - inbound.timestamp,
                "delivery denied due to long delay"
            );
            return Ok(TurnOutcome::Stale);
        }

        let first_delivery = self
            .storage
            .record_receipt(&inbound.message_id, &inbound.channel_id, now)
            .await?;
        if !first_delivery {
            return Ok(TurnOutcome::Duplicate);
        }
        self.maybe_prune_receipts(now);

        let Some(binding) = self.resolve_channel(&inbound.channel_id).await? else {
            debug!(channel_id = %inbound.channel_id, "no binding for channel");
            return Ok(TurnOutcome::ChannelNotRegistered);
        };
        trace.chatbot_id = Some(binding.chatbot_id.clone());

        let Some(chatbot) = self.storage.get_chatbot(&binding.chatbot_id).await? else {
            warn!(
                channel_id = %binding.channel_id,
                chatbot_id = %binding.chatbot_id,
                "channel is bound to a chatbot that does not exist"
            );
            return Ok(TurnOutcome::ChatbotNotFound);
        };
        if let Some(flow) = &chatbot.flow {
            if let Err(e) = validate_flow(flow) {
                error!(chatbot_id = %chatbot.id, error = %e, "stored chatbot flow is invalid");
                return Ok(TurnOutcome::InvalidFlow);
            }
        }
        self.mark_read(inbound);

        let key = ConversationKey::whatsapp(&chatbot.id, &inbound.from, &binding.display_address);
        let _guard = self.locks.lock(&key.lock_key()).await;

        let user_message = StoredMessage::user(inbound.content.text(), &inbound.from, now);
        let mut turn = self
            .conversations
            .get_or_create(&chatbot, &binding, &key, user_message.clone(), now)
            .await?;
        trace.conversation_id = Some(turn.conversation.id.clone());

        if turn.conversation.disable_auto_reply {
            return Ok(TurnOutcome::AutoReplyDisabled);
        }

        let ctx = TurnContext {
            inbound,
            binding: &binding,
            chatbot: &chatbot,
            user_message: &user_message,
            now,
        };
        match &chatbot.flow {
            Some(flow) if turn.should_restart_flow => self.flow_turn(&ctx, flow, &mut turn).await,
            _ if chatbot.ai_response_enabled() => {
                self.ai_turn(&ctx, &mut turn.conversation, ConversationState::Ai)
                    .await
            }
            _ => Ok(TurnOutcome::NoReply),
        }
    }

    /// The binding for a provider phone-number id, if an operator registered it.
    pub async fn resolve_channel(&self, channel_id: &str) -> Result<Option<ChannelBinding>, ChatwireError> {
        self.storage.get_channel_binding(channel_id).await
    }

    async fn flow_turn(
        &self,
        ctx: &TurnContext<'_>,
        flow: &QuestionFlow,
        turn: &mut ConversationTurn,
    ) -> Result<TurnOutcome, ChatwireError> {
        let step = self.flow.step(
            flow,
            &turn.conversation.state,
            &ctx.inbound.content,
            turn.restart_at_initial,
        )?;
        let step = match step {
            FlowStep::Unmatched { node_id } if !self.can_use_ai(ctx.chatbot) => {
                self.flow.reprompt(flow, &node_id)?
            }
            other => other,
        };

        match step {
            FlowStep::Emit { prompt, next_state } => {
                debug!(node_id = %prompt.node_id, options = prompt.options.len(), "emitting flow prompt");
                self.send_and_record(
                    ctx,
                    &mut turn.conversation,
                    OutboundContent::Flow(prompt),
                    FLOW_AUTHOR,
                    next_state,
                    ReplySource::Flow,
                )
                .await
            }
            FlowStep::Finished => {
                self.conversations
                    .record(&mut turn.conversation, Vec::new(), ConversationState::Ai, ctx.now)
                    .await?;
                Ok(TurnOutcome::FlowFinished)
            }
            // The AI answers, and the flow keeps waiting at the same node.
            FlowStep::Unmatched { node_id } => {
                self.ai_turn(ctx, &mut turn.conversation, ConversationState::Flow { node_id })
                    .await
            }
        }
    }

    fn can_use_ai(&self, chatbot: &Chatbot) -> bool {
        self.replier.is_some() && chatbot.ai_response_enabled()
    }

    async fn ai_turn(
        &self,
        ctx: &TurnContext<'_>,
        conversation: &mut Conversation,
        next_state: ConversationState,
    ) -> Result<TurnOutcome, ChatwireError> {
        let replier = self.replier.as_ref().ok_or_else(|| {
            ChatwireError::Config("no completion provider configured".into())
        })?;

        let request = CompletionRequest {
            system_prompt: resolve_system_prompt(ctx.binding, ctx.chatbot, &self.settings.ai),
            messages: select_context(
                history_before(&conversation.messages, ctx.user_message),
                ctx.user_message,
                ctx.now,
                &self.settings.context,
            ),
            model: model_config(&ctx.chatbot.ai, &self.settings.ai),
        };
        debug!(
            conversation_id = %conversation.id,
            context_messages = request.messages.len(),
            model = %request.model.model,
            "requesting ai reply"
        );
        let response = replier.generate(request).await?;

        self.send_and_record(
            ctx,
            conversation,
            OutboundContent::Text(response.text),
            BOT_AUTHOR,
            next_state,
            ReplySource::Ai,
        )
        .await
    }

    /// Send, then append the assistant entry. A failed send keeps the prior state.
    async fn send_and_record(
        &self,
        ctx: &TurnContext<'_>,
        conversation: &mut Conversation,
        content: OutboundContent,
        author: &str,
        next_state: ConversationState,
        via: ReplySource,
    ) -> Result<TurnOutcome, ChatwireError> {
        let delay = Duration::from_secs(ctx.binding.settings.reply_delay_secs);
        let dispatched = self
            .dispatcher
            .dispatch(
                &ctx.inbound.channel_id,
                &ctx.inbound.from,
                content,
                author,
                delay,
                ctx.now,
            )
            .await?;

        let state = if dispatched.result.is_ok() {
            next_state
        } else {
            conversation.state.clone()
        };
        self.conversations
            .record(conversation, vec![dispatched.stored], state, ctx.now)
            .await?;

        match dispatched.result {
            Ok(_) => Ok(TurnOutcome::Replied { via }),
            Err(e) => Ok(TurnOutcome::Failed {
                reason: format!("reply not delivered: {e}"),
            }),
        }
    }

    /// Best-effort read receipt, off the turn's critical path.
    fn mark_read(&self, inbound: &InboundMessage) {
        if !self.settings.mark_read {
            return;
        }
        let channel = Arc::clone(&self.channel);
        let channel_id = inbound.channel_id.clone();
        let message_id = inbound.message_id.clone();
        tokio::spawn(async move {
            if let Err(e) = channel.mark_read(&channel_id, &message_id).await {
                warn!(error = %e, message_id = %message_id, "failed to mark message as read");
            }
        });
    }

    fn maybe_prune_receipts(&self, now: DateTime<Utc>) {
        let last = self.last_prune.load(Ordering::Relaxed);
        if now.timestamp() - last < PRUNE_INTERVAL_SECS {
            return;
        }
        if self
            .last_prune
            .compare_exchange(last, now.timestamp(), Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let window = chrono::Duration::from_std(self.settings.dedup_window)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let cutoff = now - window;
        let storage = Arc::clone(&self.storage);
        tokio::spawn(async move {
            match storage.prune_receipts(cutoff).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "pruned inbound receipts"),
                Err(e) => warn!(error = %e, "failed to prune inbound receipts"),
            }
        });
    }
}

/// The stored history minus this turn's own message, which `get_or_create`
/// already appended. Windowing runs over earlier turns only.
fn history_before<'m>(messages: &'m [StoredMessage], current: &StoredMessage) -> &'m [StoredMessage] {
    match messages.split_last() {
        Some((last, earlier)) if last == current => earlier,
        _ => messages,
    }
}
