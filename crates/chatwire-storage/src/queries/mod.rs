// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table group.

pub mod bindings;
pub mod chatbots;
pub mod conversations;
pub mod receipts;
