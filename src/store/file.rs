//! JSON file backed durable store
//!
//! The whole store is one JSON object mapping keys to string values. It is
//! loaded once at open and rewritten on every mutation. Writes go to a
//! sibling temp file which is then renamed over the store file, so a crash
//! mid-write leaves the previous contents intact.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use super::{DurableStore, StoreError, StoreResult};

/// Store persisted to a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories if needed.
    ///
    /// A missing file opens as an empty store. A file that exists but is not
    /// a JSON object of strings is an error.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        info!("Opened file store at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to disk. The file is synced before the rename.
    fn persist(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let encoded = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");

        let result = Self::write_synced(&tmp_path, encoded.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &self.path));

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        debug!("Persisted {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    /// Apply `update` to a copy of the entries, persist the copy, then swap it in.
    ///
    /// A failed write leaves the in-memory entries untouched.
    fn commit<F>(&self, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock file store: {}", e)))?;

        let mut next = entries.clone();
        if !update(&mut next) {
            return Ok(());
        }

        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock file store: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.commit(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let entries = self.entries.lock()
            .map_err(|e| StoreError::Lock(format!("Failed to lock file store: {}", e)))?;
        Ok(entries.keys().cloned().collect())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
