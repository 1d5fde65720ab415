//! Key-value persistence for presets, playlists and calibration
//!
//! Each key holds one JSON document. Reads never fail: a missing key or a
//! document that no longer decodes is reported with a warning and treated as
//! absent, so a corrupt store degrades to an empty one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PRESETS_KEY: &str = "presets";
pub const PLAYLISTS_KEY: &str = "playlists";
pub const CALIBRATION_KEY: &str = "a4_calibration";

/// Raw string storage under fixed keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Decode the JSON document under `key`, or `None` if missing or unreadable.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            log::warn!("[Storage] Failed to read '{}': {}. Treating as empty.", key, err);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!(
                "[Storage] Stored '{}' is corrupt: {}. Treating as empty.",
                key,
                err
            );
            None
        }
    }
}

/// Encode `value` as JSON under `key`.
pub fn store_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> io::Result<()> {
    let raw = serde_json::to_string(value).map_err(io::Error::other)?;
    store.set(key, &raw)
}

/// In-process store, used by tests and when no data directory is wanted.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> io::Error {
    io::Error::other("memory store lock poisoned")
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        // Write then rename so a crash never leaves a half-written document
        let target = self.path_for(key);
        let staging = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&staging, value)?;
        fs::rename(staging, target)
    }
}
