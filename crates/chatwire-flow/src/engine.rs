// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow state transitions.
//!
//! Decision order for one inbound message:
//! restart > resume at recorded node > unmatched-input policy.

use chatwire_core::ChatwireError;
use chatwire_core::types::{
    ConversationState, FlowNode, FlowOption, FlowPrompt, FlowPromptOption, InboundContent,
    QuestionFlow, UnmatchedInputPolicy,
};
use tracing::debug;

/// What the flow decided for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    /// Send `prompt`; the conversation moves to `next_state`.
    ///
    /// `next_state` is [`ConversationState::Ai`] for terminal nodes.
    Emit {
        prompt: FlowPrompt,
        next_state: ConversationState,
    },
    /// An option without a target was chosen. Nothing is sent; the flow is over.
    Finished,
    /// Input matched no option and the policy hands the turn to the AI.
    Unmatched { node_id: String },
}

/// Stateless question-flow engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowEngine {
    unmatched: UnmatchedInputPolicy,
}

impl FlowEngine {
    pub fn new(unmatched: UnmatchedInputPolicy) -> Self {
        Self { unmatched }
    }

    /// Decide the next flow step.
    ///
    /// With `restart` set (new conversation or continuity timeout) the initial
    /// prompt is emitted and any selection is ignored. Otherwise the flow resumes
    /// at the node recorded in `state`; a conversation not waiting on a node
    /// (state `Ai`, or a node since removed from the flow) starts over.
    pub fn step(
        &self,
        flow: &QuestionFlow,
        state: &ConversationState,
        input: &InboundContent,
        restart: bool,
    ) -> Result<FlowStep, ChatwireError> {
        let current = match state {
            ConversationState::Flow { node_id } if !restart => find_node(flow, node_id),
            _ => None,
        };

        let Some(node) = current else {
            debug!(restart, "starting flow at initial node");
            return Ok(emit(initial_node(flow)?));
        };

        match match_option(node, input) {
            Some(option) => match &option.target_node_id {
                Some(target) => {
                    let next = find_node(flow, target).ok_or_else(|| {
                        ChatwireError::InvalidFlow(format!(
                            "option `{}` targets unknown node `{target}`",
                            option.id
                        ))
                    })?;
                    debug!(from = %node.id, option = %option.id, to = %next.id, "flow transition");
                    Ok(emit(next))
                }
                None => {
                    debug!(from = %node.id, option = %option.id, "flow finished");
                    Ok(FlowStep::Finished)
                }
            },
            None => match self.unmatched {
                UnmatchedInputPolicy::Reprompt => {
                    debug!(node = %node.id, "unmatched input, re-prompting");
                    Ok(emit(node))
                }
                UnmatchedInputPolicy::FallbackToAi => Ok(FlowStep::Unmatched {
                    node_id: node.id.clone(),
                }),
            },
        }
    }

    /// Prompt for a known node, used to re-ask when the AI cannot take an unmatched turn.
    pub fn reprompt(&self, flow: &QuestionFlow, node_id: &str) -> Result<FlowStep, ChatwireError> {
        match find_node(flow, node_id) {
            Some(node) => Ok(emit(node)),
            None => Ok(emit(initial_node(flow)?)),
        }
    }
}

/// The single initial node of a flow.
pub fn initial_node(flow: &QuestionFlow) -> Result<&FlowNode, ChatwireError> {
    flow.nodes
        .iter()
        .find(|n| n.is_initial)
        .ok_or_else(|| ChatwireError::InvalidFlow("no initial node".into()))
}

fn find_node<'a>(flow: &'a QuestionFlow, id: &str) -> Option<&'a FlowNode> {
    flow.nodes.iter().find(|n| n.id == id)
}

/// Match input against a node's options.
///
/// An interactive selection id is checked first. Then the text is compared,
/// trimmed and case-insensitively, with option ids and labels, and finally
/// read as a 1-based option number.
fn match_option<'a>(node: &'a FlowNode, input: &InboundContent) -> Option<&'a FlowOption> {
    if let Some(selected) = input.selection_id() {
        if let Some(option) = node.options.iter().find(|o| o.id == selected) {
            return Some(option);
        }
    }

    let text = input.text().trim();
    if text.is_empty() {
        return None;
    }
    node.options
        .iter()
        .find(|o| o.id.eq_ignore_ascii_case(text) || o.label.trim().to_lowercase() == text.to_lowercase())
        .or_else(|| {
            text.parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .and_then(|n| node.options.get(n - 1))
        })
}

fn emit(node: &FlowNode) -> FlowStep {
    let next_state = if node.options.is_empty() {
        ConversationState::Ai
    } else {
        ConversationState::Flow {
            node_id: node.id.clone(),
        }
    };
    FlowStep::Emit {
        prompt: FlowPrompt {
            node_id: node.id.clone(),
            prompt: node.prompt.clone(),
            options: node
                .options
                .iter()
                .map(|o| FlowPromptOption {
                    id: o.id.clone(),
                    label: o.label.clone(),
                })
                .collect(),
        },
        next_state,
    }
}
