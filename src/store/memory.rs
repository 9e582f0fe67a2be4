use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{counter_value, KvStore};

/// In-process store used with `STORE_BACKEND=memory` and in tests
///
/// The store can be switched into an unavailable mode in which every call
/// fails, or told to refuse writes to particular keys, which is how outages
/// are simulated.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, JsonValue>>,
    unavailable: AtomicBool,
    read_only_keys: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn fail_writes_to(&self, key: &str) {
        self.read_only_keys.lock().insert(key.to_string());
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("memory store is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        self.ensure_available()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        self.ensure_available()?;
        if self.read_only_keys.lock().contains(key) {
            bail!("memory store refused write to '{}'", key);
        }
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn fetch_and_increment(&self, key: &str, initial: u64) -> Result<u64> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        let current = counter_value(entries.get(key), initial);
        let next = current
            .checked_add(1)
            .with_context(|| format!("Counter '{}' is exhausted at {}", key, current))?;
        entries.insert(key.to_string(), JsonValue::from(next));
        Ok(current)
    }

    async fn health_check(&self) -> Result<()> {
        self.ensure_available()
    }
}
