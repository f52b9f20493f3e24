// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question-flow engine for Chatwire.
//!
//! A question flow is a graph of prompts whose options lead to other prompts.
//! This crate checks a flow's structure ([`validate`]) and decides, for one
//! inbound message, which prompt to send next ([`FlowEngine::step`]).

pub mod engine;
pub mod validate;

pub use engine::{FlowEngine, FlowStep};
pub use validate::validate;
