use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{lock_poisoned, KeyValueStore};
use crate::errors::LedgerError;

/// Non-durable store backed by an in-process map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, i64>>,
    commits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing values.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let map = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: Mutex::new(map),
            commits: AtomicU64::new(0),
        }
    }

    /// Number of times `commit()` has been called.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>, LedgerError> {
        let values = self.values.lock().map_err(lock_poisoned)?;
        Ok(values.get(key).copied())
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), LedgerError> {
        let mut values = self.values.lock().map_err(lock_poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&self) -> Result<(), LedgerError> {
        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<Option<i64>, LedgerError> {
        let mut values = self.values.lock().map_err(lock_poisoned)?;
        Ok(values.remove(key))
    }

    fn keys(&self) -> Result<Vec<String>, LedgerError> {
        let values = self.values.lock().map_err(lock_poisoned)?;
        Ok(values.keys().cloned().collect())
    }
}
