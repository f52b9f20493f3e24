// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staleness check for inbound deliveries.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Returns `true` when a message originated more than `max_age` before `now`.
///
/// Timestamps in the future are never too old.
pub fn is_too_old(origination: i64, now: DateTime<Utc>, max_age: Duration) -> bool {
    let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    origination.saturating_add(max_age) < now.timestamp()
}
