// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatwire conversational pipeline.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by every other crate in the workspace. Channel, provider, and
//! storage adapters implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ChatwireError;
pub use types::{AdapterType, HealthStatus, MessageId};

pub use traits::{ChannelAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};
