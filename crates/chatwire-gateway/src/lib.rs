// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Chatwire.
//!
//! Serves the WhatsApp webhook (subscription handshake and deliveries), the
//! bearer-authenticated operator API used to bind channels and configure
//! chatbots, and an unauthenticated health probe.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mirror;
pub mod server;
pub mod webhook;

pub use mirror::PayloadMirror;
pub use server::{GatewayState, HealthState, WebhookSettings, router, start_server};
