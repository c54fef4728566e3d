//! Time-bound read cache with prefix invalidation.
//!
//! Entries expire lazily: an expired entry is removed by the read that finds
//! it. The clock is `tokio::time::Instant`, so paused-time tests control
//! expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// String-keyed cache whose entries live for a fixed TTL.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The live value for `key`, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` and hand it back.
    pub fn insert(&self, key: &str, value: V) -> V {
        let entry = Entry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().insert(key.to_string(), entry);
        value
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.lock()
            .retain(|key, _| !dockyard_common::under_prefix(key, prefix));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
