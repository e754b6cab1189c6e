//! Keyed async mutual exclusion.
//!
//! Entry/exit matching must be serialized per symbol and log writes per
//! batch; two near-simultaneous signals for one symbol must not both see
//! "no open trade". One lock per key, created on first use.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedMutex {
    // Entries are never removed; the map is bounded by the number of
    // distinct symbols and batches seen by this process.
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
