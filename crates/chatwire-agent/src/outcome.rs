// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message turn results.

use std::fmt;

/// Which component produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Flow,
    Ai,
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySource::Flow => write!(f, "flow"),
            ReplySource::Ai => write!(f, "ai"),
        }
    }
}

/// How one inbound message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A reply was sent.
    Replied { via: ReplySource },
    /// A flow option without a target ended the flow; nothing was sent.
    FlowFinished,
    /// Neither the flow nor the AI could take the turn.
    NoReply,
    /// The message originated too long ago.
    Stale,
    /// The message id was already processed.
    Duplicate,
    ChannelNotRegistered,
    /// The channel points at a chatbot that does not exist.
    ChatbotNotFound,
    /// The chatbot's stored flow breaks its structural invariants.
    InvalidFlow,
    AutoReplyDisabled,
    /// A dependency failed. Nothing is retried.
    Failed { reason: String },
}

/// Flattened turn result: `success` is false only for failed turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub success: bool,
    pub message: String,
}

impl TurnOutcome {
    pub fn report(&self) -> TurnReport {
        let (success, message) = match self {
            TurnOutcome::Replied { via } => (true, format!("replied via {via}")),
            TurnOutcome::FlowFinished => (true, "flow finished".to_string()),
            TurnOutcome::NoReply => (true, "no reply".to_string()),
            TurnOutcome::Stale => (true, "stale".to_string()),
            TurnOutcome::Duplicate => (true, "duplicate".to_string()),
            TurnOutcome::ChannelNotRegistered => (true, "channel not registered".to_string()),
            TurnOutcome::ChatbotNotFound => (true, "chatbot not found".to_string()),
            TurnOutcome::InvalidFlow => (true, "chatbot flow is invalid".to_string()),
            TurnOutcome::AutoReplyDisabled => (true, "auto response is disabled".to_string()),
            TurnOutcome::Failed { reason } => (false, reason.clone()),
        };
        TurnReport { success, message }
    }

    /// Whether the message reached a registered chatbot and was handled without error.
    ///
    /// Drives the `OK`/`NO` status answered to the webhook sender.
    pub fn accepted(&self) -> bool {
        matches!(
            self,
            TurnOutcome::Replied { .. }
                | TurnOutcome::FlowFinished
                | TurnOutcome::NoReply
                | TurnOutcome::Duplicate
                | TurnOutcome::AutoReplyDisabled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_reports_success() {
        assert_eq!(
            TurnOutcome::Stale.report(),
            TurnReport {
                success: true,
                message: "stale".into()
            }
        );
    }

    #[test]
    fn only_failures_report_unsuccessful() {
        let failed = TurnOutcome::Failed {
            reason: "provider error: boom".into(),
        };
        assert!(!failed.report().success);
        assert_eq!(failed.report().message, "provider error: boom");
        assert!(TurnOutcome::ChannelNotRegistered.report().success);
        assert_eq!(
            TurnOutcome::Replied { via: ReplySource::Ai }.report().message,
            "replied via ai"
        );
    }

    #[test]
    fn acceptance() {
        assert!(TurnOutcome::Replied { via: ReplySource::Flow }.accepted());
        assert!(TurnOutcome::AutoReplyDisabled.accepted());
        assert!(!TurnOutcome::ChannelNotRegistered.accepted());
        assert!(!TurnOutcome::InvalidFlow.accepted());
        assert!(!TurnOutcome::Stale.accepted());
        assert!(!TurnOutcome::Failed { reason: String::new() }.accepted());
    }
}
