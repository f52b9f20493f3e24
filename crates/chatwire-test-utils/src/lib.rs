// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chatwire integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without WhatsApp or a completion API.
//!
//! # Components
//!
//! - [`MockProvider`] - completion provider with queued replies, failures and delays
//! - [`MockChannel`] - channel adapter that captures sends and read receipts
//! - [`TestHarness`] - temp SQLite storage plus a [`chatwire_agent::TurnPipeline`]
//! - [`fixtures`] - a bound channel, a chatbot and a sample question flow

pub mod fixtures;
pub mod harness;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_provider::MockProvider;
