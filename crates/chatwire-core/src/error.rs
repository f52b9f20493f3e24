// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatwire pipeline.

use thiserror::Error;

/// The primary error type used across all Chatwire adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging channel errors (Cloud API rejection, network failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// AI completion provider errors (API failure, empty completion).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A record the caller expected to exist is missing.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// A conditional write lost against a concurrent writer.
    #[error("write conflict: {message}")]
    Conflict { message: String },

    /// A question flow graph violates its structural invariants.
    #[error("invalid question flow: {0}")]
    InvalidFlow(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatwireError {
    /// Shorthand for a [`ChatwireError::NotFound`] value.
    pub fn not_found(kind: &str, id: impl Into<String>) -> Self {
        ChatwireError::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    /// Returns `true` for errors caused by an external dependency (AI provider,
    /// messaging channel, or a timeout talking to either).
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            ChatwireError::Provider { .. }
                | ChatwireError::Channel { .. }
                | ChatwireError::Timeout { .. }
        )
    }
}
