use std::path::{Path, PathBuf};

use log::debug;
use sled::IVec;

use super::KeyValueStore;
use crate::errors::LedgerError;

const TREE_BALANCES: &str = "balances";
const KEY_PREFIX: &str = "balance:";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct SledStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl SledStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Remove the database files when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<SledStore, LedgerError> {
        SledStore::open_with_options(self.path, self.temporary)
    }
}

/// Sled-backed persistence for balance amounts.
pub struct SledStore {
    _db: sled::Db,
    balances: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, temporary: bool) -> Result<Self, LedgerError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::Config::new()
            .path(path_ref)
            .temporary(temporary)
            .open()?;
        let balances = db.open_tree(TREE_BALANCES)?;
        debug!("opened sled balance store at {}", path_ref.display());
        Ok(Self { _db: db, balances })
    }

    fn balance_key(identifier: &str) -> Vec<u8> {
        format!("{}{}", KEY_PREFIX, identifier).into_bytes()
    }

    fn deserialize(bytes: IVec) -> Result<i64, LedgerError> {
        Ok(bincode::deserialize::<i64>(&bytes)?)
    }
}

impl KeyValueStore for SledStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>, LedgerError> {
        let Some(bytes) = self.balances.get(Self::balance_key(key))? else {
            return Ok(None);
        };
        Ok(Some(Self::deserialize(bytes)?))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(&value)?;
        self.balances.insert(Self::balance_key(key), bytes)?;
        Ok(())
    }

    fn commit(&self) -> Result<(), LedgerError> {
        self.balances.flush()?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<Option<i64>, LedgerError> {
        match self.balances.remove(Self::balance_key(key))? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn keys(&self) -> Result<Vec<String>, LedgerError> {
        let mut ids = Vec::new();
        for entry in self.balances.scan_prefix(KEY_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(identifier) = text.strip_prefix(KEY_PREFIX) {
                ids.push(identifier.to_string());
            }
        }
        Ok(ids)
    }
}
