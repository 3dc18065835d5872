// src/runner/lock.rs

//! Keyed, non-blocking mutual exclusion.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

/// A lock that is taken per key and never waits.
///
/// `try_acquire` returns a guard if nobody holds `key`, `None` otherwise.
/// Dropping the guard releases the key. Different keys never contend.
pub trait KeyedLock: Send + Sync {
    type Guard: Send;

    fn try_acquire(&self, key: &str) -> Option<Self::Guard>;
}

/// Process-local keyed lock.
#[derive(Debug, Clone, Default)]
pub struct LocalKeyedLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl LocalKeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: &str) -> bool {
        lock_set(&self.held).contains(key)
    }
}

impl KeyedLock for LocalKeyedLock {
    type Guard = LocalLockGuard;

    fn try_acquire(&self, key: &str) -> Option<LocalLockGuard> {
        if !lock_set(&self.held).insert(key.to_string()) {
            trace!(key = %key, "lock busy");
            return None;
        }

        trace!(key = %key, "lock acquired");
        Some(LocalLockGuard {
            held: Arc::clone(&self.held),
            key: key.to_string(),
        })
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct LocalLockGuard {
    held: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for LocalLockGuard {
    fn drop(&mut self) {
        lock_set(&self.held).remove(&self.key);
        trace!(key = %self.key, "lock released");
    }
}

fn lock_set(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
