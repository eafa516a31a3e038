//! Key-value storage for the cart's line items
//!
//! Only the items are stored, under the `cart` key as `{ "items": [...] }`.
//! Coupons and totals are rebuilt on load.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::domain::aggregates::LineItem;

pub const CART_KEY: &str = "cart";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.entries().insert(key.to_string(), value.into());
        storage
    }
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { Ok(self.entries().get(key).cloned()) }
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> { self.entries().insert(key.to_string(), value); Ok(()) }
    fn remove(&mut self, key: &str) -> Result<(), StorageError> { self.entries().remove(key); Ok(()) }
}

/// One JSON file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid { return Err(StorageError::InvalidKey(key.to_string())); }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        // Write then rename so a crash never leaves a half-written cart.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_error(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_error(&path))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(&path)(e)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCart {
    #[serde(default)]
    items: Vec<LineItem>,
}

/// Reads stored items. Anything unreadable is logged and treated as an empty cart.
pub fn load_items(storage: &dyn KeyValueStorage) -> Vec<LineItem> {
    let raw = match storage.get(CART_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            error!(error = %e, "failed to read stored cart");
            return Vec::new();
        }
    };
    match serde_json::from_str::<PersistedCart>(&raw) {
        Ok(cart) => {
            debug!(items = cart.items.len(), "restored cart");
            cart.items
        }
        Err(e) => {
            warn!(error = %e, "discarding malformed stored cart");
            Vec::new()
        }
    }
}

pub fn save_items(storage: &mut dyn KeyValueStorage, items: &[LineItem]) -> Result<(), StorageError> {
    #[derive(Serialize)]
    struct Borrowed<'a> { items: &'a [LineItem] }
    let raw = serde_json::to_string(&Borrowed { items })?;
    storage.set(CART_KEY, raw)
}
