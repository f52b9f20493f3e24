// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound turn pipeline for Chatwire.
//!
//! [`TurnPipeline`] takes one normalized [`InboundMessage`](chatwire_core::types::InboundMessage)
//! and decides, under a per-conversation lock, whether the question flow or
//! the AI answers it:
//!
//! - [`guard`]: stale-delivery check
//! - [`conversation`]: get-or-create with continuity timeout and versioned writes
//! - [`context`]: history windowing and prompt resolution for AI replies
//! - [`reply`]: bounded-latency completion calls
//! - [`dispatch`]: sends and delivery markers
//! - [`shutdown`]: signal handling and draining of in-flight turns

pub mod context;
pub mod conversation;
pub mod dispatch;
pub mod guard;
pub mod locks;
pub mod outcome;
pub mod pipeline;
pub mod reply;
pub mod shutdown;

pub use outcome::{ReplySource, TurnOutcome, TurnReport};
pub use pipeline::{PipelineSettings, TurnPipeline};
