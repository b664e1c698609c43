//! # Exchange Locks
//!
//! Exchange services read a record, mutate it and write it back. Two inbound
//! messages for the same exchange processed concurrently would lose one of
//! the updates, so the dispatcher holds a per-key async lock around each
//! handler invocation.
//!
//! Different keys never contend. Entries are removed once nobody holds or
//! waits for them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Keyed async mutex.
#[derive(Default, Clone)]
pub struct ExchangeLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl ExchangeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> ExchangeGuard {
        let mutex = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        trace!(key, "waiting for exchange lock");
        let guard = mutex.lock_owned().await;
        ExchangeGuard {
            guard: Some(guard),
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Releases the key on drop.
pub struct ExchangeGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<Mutex<LockMap>>,
}

impl ExchangeGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        // Release the async mutex before deciding whether the entry is idle.
        self.guard.take();
        let mut locks = self.locks.lock();
        if let Some(mutex) = locks.get(&self.key) {
            if Arc::strong_count(mutex) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}
