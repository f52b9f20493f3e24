// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business Cloud API integration for Chatwire.
//!
//! - [`webhook`]: typed webhook payloads and the normalizer producing
//!   [`chatwire_core::types::InboundMessage`]s, plus the subscription handshake.
//! - [`signature`]: `X-Hub-Signature-256` verification.
//! - [`render`]: outbound message payloads (text, reply buttons, lists).
//! - [`client`]: [`WhatsAppChannel`], the [`chatwire_core::ChannelAdapter`].

pub mod client;
pub mod render;
pub mod signature;
pub mod webhook;

pub use client::WhatsAppChannel;
pub use signature::verify_signature;
pub use webhook::{WebhookPayload, normalize};
