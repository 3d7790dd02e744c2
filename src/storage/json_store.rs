use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use log::debug;

use super::{lock_poisoned, KeyValueStore};
use crate::errors::LedgerError;

/// Store that keeps every balance in one pretty-printed JSON object.
///
/// Writes are staged in memory and only reach disk on [`KeyValueStore::commit`],
/// which replaces the file atomically while holding an exclusive lock on a
/// sibling `<file>.lock`. The data file itself is never locked: the rename
/// swaps its inode, so a lock on it would not exclude the next writer.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl JsonFileStore {
    /// Open the file at `path`, starting empty when it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let values: BTreeMap<String, i64> = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(
            "opened json balance store at {} ({} keys)",
            path.display(),
            values.len()
        );
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock file guarding commits to this store's path.
    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.path)
    }

    fn write_file_locked(path: &Path, content: &str) -> Result<(), LedgerError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path_for(path))?;
        lock_file.lock_exclusive()?;

        let dir = parent_dir(path);
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("balances.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        };

        fs::rename(&tmp_path, path)?;
        // Best-effort: persist the rename itself
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        lock_file.unlock()?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "balances.json".into());
    name.push(".lock");
    parent_dir(path).join(name)
}

impl KeyValueStore for JsonFileStore {
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
        let content = {
            let values = self.values.lock().map_err(lock_poisoned)?;
            serde_json::to_string_pretty(&*values)?
        };
        Self::write_file_locked(&self.path, &content)
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
