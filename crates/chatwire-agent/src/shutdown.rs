// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown: signal handling and draining of in-flight turns.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Returns a token cancelled on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                        _ = trigger.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                        _ = trigger.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
                _ = trigger.cancelled() => return,
            }
        }

        trigger.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for tracked turn tasks to finish.
///
/// Returns `true` when every task completed in time.
pub async fn drain_turns(tracker: &TaskTracker, timeout: Duration) -> bool {
    tracker.close();
    if tracker.is_empty() {
        info!("no in-flight turns to drain");
        return true;
    }

    info!(count = tracker.len(), "waiting for in-flight turns");
    match tokio::time::timeout(timeout, tracker.wait()).await {
        Ok(()) => {
            info!("in-flight turns drained");
            true
        }
        Err(_) => {
            warn!(remaining = tracker.len(), "drain timeout reached, abandoning turns");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_handler_token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_with_no_turns_returns_immediately() {
        let tracker = TaskTracker::new();
        assert!(drain_turns(&tracker, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn drain_waits_for_running_turns() {
        let tracker = TaskTracker::new();
        tracker.spawn(tokio::time::sleep(Duration::from_millis(20)));
        assert!(drain_turns(&tracker, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn drain_gives_up_after_timeout() {
        let tracker = TaskTracker::new();
        tracker.spawn(tokio::time::sleep(Duration::from_secs(30)));
        assert!(!drain_turns(&tracker, Duration::from_millis(20)).await);
    }
}
