//! Key/value record store for persisted client state.
//!
//! Records are opaque JSON documents under a small set of fixed keys. The
//! tracker and the paper book only ever see the [`RecordStore`] trait, so
//! tests run against [`MemoryRecordStore`] and the CLI against
//! [`FileRecordStore`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Key of the persisted `ProgressState`.
pub const PROGRESS_KEY: &str = "progress";
/// Key of the persisted paper-portfolio list.
pub const PAPER_PORTFOLIOS_KEY: &str = "paper_portfolios";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid record key '{0}'")]
    InvalidKey(String),
}

/// Persisted JSON records by key.
pub trait RecordStore: Send + Sync {
    /// The stored JSON for `key`, or `None` if nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the record under `key`.
    fn save(&self, key: &str, json: &str) -> Result<(), StoreError>;
}

/// Load and decode a record. Missing, unreadable or corrupt records yield
/// `T::default()`; the latter two are logged.
pub fn load_or_default<T>(store: &dyn RecordStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.load(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "corrupt record, loading defaults");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "failed to read record, loading defaults");
            T::default()
        }
    }
}

/// Encode and save a record.
pub fn save_record<T: Serialize>(
    store: &dyn RecordStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    store.save(key, &json)
}

// ── File store ───────────────────────────────────────────────────────

/// One `<key>.json` file per record inside a data directory.
///
/// Saves write a sibling temp file and rename it over the record, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ── In-memory store ──────────────────────────────────────────────────

/// Records held in memory. Used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key.to_string(), json.to_string());
        Ok(())
    }
}
