// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key async mutexes.
//!
//! Turns on the same conversation key run one at a time; different keys run
//! in parallel. An entry lives only while some turn holds or waits for it,
//! including waiters whose `lock()` future is dropped before it resolves.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<Mutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

type Registry = DashMap<String, Slot>;

#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Registry>,
}

/// One holder's or waiter's stake in a registry slot.
#[derive(Debug)]
struct Claim {
    key: String,
    registry: Arc<Registry>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.remove_if_mut(&self.key, |_, slot| {
            slot.users -= 1;
            slot.users == 0
        });
    }
}

/// Held for the duration of a turn. Dropping it releases the key.
#[derive(Debug)]
pub struct KeyGuard {
    // Field order matters: the mutex is released before the claim.
    _guard: OwnedMutexGuard<()>,
    _claim: Claim,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Cancel safe: dropping the returned future before it resolves gives
    /// up the wait and forgets the key if nobody else uses it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut slot = self.inner.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };
        let claim = Claim {
            key: key.to_string(),
            registry: Arc::clone(&self.inner),
        };
        let guard = mutex.lock_owned().await;
        KeyGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("bot:whatsapp:1555:5511").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_forgotten() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock("a").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn abandoned_waiters_do_not_pin_keys() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("a").await;

        let mut waiter = Box::pin(locks.lock("a"));
        let waited = tokio::time::timeout(Duration::from_millis(20), &mut waiter).await;
        assert!(waited.is_err(), "key is held, the waiter must still be pending");

        drop(holder);
        assert_eq!(locks.len(), 1, "the pending waiter keeps the key alive");

        drop(waiter);
        assert!(locks.is_empty());

        // The key is usable again afterwards.
        let again = tokio::time::timeout(Duration::from_millis(100), locks.lock("a")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn timed_out_waiter_is_forgotten_with_its_holder() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("a").await;
        let waited = tokio::time::timeout(Duration::from_millis(20), locks.lock("a")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert!(locks.is_empty());
    }
}
