//! # Storage Module - Balance Persistence Layer
//!
//! Balances persist as a single integer per identifier. The core only depends on
//! the small [`KeyValueStore`] contract defined here; concrete backends are
//! chosen by the caller (usually from [`crate::config::StorageConfig`]) and
//! injected at construction.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - in-process map, useful for tests and throwaway sessions
//! - [`SledStore`] - embedded sled tree, values bincode-encoded
//! - [`JsonFileStore`] - one JSON object file, written atomically on commit
//!
//! ## Semantics
//!
//! `set_int` may stage a value; it is only guaranteed durable after
//! `commit()` returns. Reads always observe staged values.
//!
//! ```rust
//! use std::sync::Arc;
//! use tradeledger::storage::{KeyValueStore, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.set_int("coins", 10).unwrap();
//! store.commit().unwrap();
//! assert_eq!(store.get_int_or("coins", 0).unwrap(), 10);
//! assert!(store.require_int("gems").is_err());
//! ```

use std::sync::Arc;

use crate::errors::LedgerError;

pub mod json_store;
pub mod memory;
pub mod sled_store;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;
pub use sled_store::{SledStore, SledStoreBuilder};

/// Shared handle to a store, cloned into every balance that persists through it.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Minimal synchronous key-value contract balances persist through.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_int(&self, key: &str) -> Result<Option<i64>, LedgerError>;

    /// Stage `value` under `key`.
    fn set_int(&self, key: &str, value: i64) -> Result<(), LedgerError>;

    /// Flush staged writes to durable storage. Blocks until done.
    fn commit(&self) -> Result<(), LedgerError>;

    /// Delete `key`, returning the value it held.
    fn remove_key(&self, key: &str) -> Result<Option<i64>, LedgerError>;

    /// All keys currently present, sorted.
    fn keys(&self) -> Result<Vec<String>, LedgerError>;

    /// Read `key`, falling back to `default` when absent.
    fn get_int_or(&self, key: &str, default: i64) -> Result<i64, LedgerError> {
        Ok(self.get_int(key)?.unwrap_or(default))
    }

    /// Read `key`, failing with [`LedgerError::NotFound`] when absent.
    fn require_int(&self, key: &str) -> Result<i64, LedgerError> {
        self.get_int(key)?
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))
    }
}

pub(crate) fn lock_poisoned<T>(_: std::sync::PoisonError<T>) -> LedgerError {
    LedgerError::Internal("store lock poisoned".to_string())
}
