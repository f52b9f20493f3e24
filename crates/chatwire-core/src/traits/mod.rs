// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the pipeline talks to.
//!
//! Each extends [`PluginAdapter`] and is `#[async_trait]` so the pipeline can
//! hold it as `Arc<dyn ..>`.

pub mod adapter;
pub mod channel;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
