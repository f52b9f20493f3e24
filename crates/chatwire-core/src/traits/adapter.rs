// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every adapter.

use async_trait::async_trait;

use crate::error::ChatwireError;
use crate::types::{AdapterType, HealthStatus};

/// Supertrait of the channel, provider and storage adapters.
///
/// The binary only needs this surface to log what it wired up, report health
/// and release resources on shutdown.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short identifier used in logs, e.g. `"whatsapp"` or `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Cheap liveness probe. `Err` means the backend could not be reached at all.
    async fn health_check(&self) -> Result<HealthStatus, ChatwireError>;

    /// Release connections and background tasks.
    async fn shutdown(&self) -> Result<(), ChatwireError>;
}
