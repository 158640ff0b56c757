//! Durable key-value storage for the session.
//!
//! Writes are best-effort from the caller's point of view: the trait methods
//! never fail, and a persistence error is logged and otherwise ignored so the
//! in-memory session stays authoritative for the life of the process.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Set every entry in a single write.
    fn set_many(&self, entries: &[(&str, &str)]);

    /// Remove every key in a single write.
    fn remove_many(&self, keys: &[&str]);
}

fn lock(map: &Mutex<BTreeMap<String, String>>) -> MutexGuard<'_, BTreeMap<String, String>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) {
        let mut map = lock(&self.entries);
        for (k, v) in entries {
            map.insert((*k).to_string(), (*v).to_string());
        }
    }

    fn remove_many(&self, keys: &[&str]) {
        let mut map = lock(&self.entries);
        for k in keys {
            map.remove(*k);
        }
    }
}

/// JSON object file, rewritten through a temp file and rename on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A missing file is an empty
    /// store; an unreadable or corrupt one is logged and treated as empty.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "session file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to read session file, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, String>) {
        if let Err(e) = write_atomically(&self.path, map) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to persist session file");
        }
    }
}

fn write_atomically(path: &Path, map: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let json = serde_json::to_vec_pretty(map).map_err(std::io::Error::other)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) {
        let mut map = lock(&self.entries);
        for (k, v) in entries {
            map.insert((*k).to_string(), (*v).to_string());
        }
        self.persist(&map);
    }

    fn remove_many(&self, keys: &[&str]) {
        let mut map = lock(&self.entries);
        for k in keys {
            map.remove(*k);
        }
        if map.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "failed to remove session file"),
            }
        } else {
            self.persist(&map);
        }
    }
}
