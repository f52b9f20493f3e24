// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Chatwire pipeline.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection
//! via `tokio-rusqlite`. Stores channel bindings, chatbots, conversations
//! with their history, and inbound message receipts for de-duplication.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
