use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use log::trace;

use super::CacheKey;

/// One mutex per cache key, so writers of the same entry queue up while
/// unrelated entries proceed in parallel.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> KeyedLocks {
        KeyedLocks::default()
    }

    /// Runs `f` while holding the lock for `key`. The lock is released when `f`
    /// returns, whatever it returns.
    pub fn with_lock<T>(&self, key: &CacheKey, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            trace!("Holding cache lock for {}", key.as_str());
            f()
        };
        // Only the map and this call hold the mutex: nobody is waiting for it.
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) <= 2);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
