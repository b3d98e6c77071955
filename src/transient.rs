use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTransient {
    value: Value,
    /// `None` means the entry never expires.
    expires_at: Option<DateTime<Utc>>,
}

impl StoredTransient {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Key/value store with per-entry expiry.
///
/// Entries live in memory and, for a persistent store, are mirrored to one
/// JSON file per key so they survive between runs.
pub struct TransientStore {
    dir: Option<PathBuf>,
    entries: Mutex<HashMap<String, StoredTransient>>,
}

impl TransientStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a store backed by `dir`, creating the directory if needed.
    pub fn persistent(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create transient directory {}", dir.display()))?;
        Ok(Self {
            dir: Some(dir),
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the stored value when present, unexpired, and of the expected shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Utc::now();
        let mut entries = self.lock();

        if !entries.contains_key(key) {
            let loaded = self.load_file(key)?;
            entries.insert(key.to_string(), loaded);
        }

        let expired = entries.get(key)?.is_expired(now);
        if expired {
            debug!("Transient '{}' expired", key);
            entries.remove(key);
            drop(entries);
            self.remove_file(key);
            return None;
        }

        let value = entries.get(key)?.value.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Transient '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Stores `value` under `key`; `ttl` of `None` keeps it until deleted.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let stored = StoredTransient {
            value: serde_json::to_value(value)
                .with_context(|| format!("Failed to serialize transient '{}'", key))?,
            expires_at: ttl.map(|ttl| Utc::now() + ttl),
        };

        if let Some(path) = self.path_for(key) {
            let content = serde_json::to_string(&stored)?;
            fs::write(&path, content)
                .with_context(|| format!("Failed to write transient {}", path.display()))?;
        }

        self.lock().insert(key.to_string(), stored);
        Ok(())
    }

    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
        self.remove_file(key);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredTransient>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{}.json", key)))
    }

    fn load_file(&self, key: &str) -> Option<StoredTransient> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn remove_file(&self, key: &str) {
        if let Some(path) = self.path_for(key)
            && path.exists()
            && let Err(e) = fs::remove_file(&path)
        {
            debug!("Failed to remove transient {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn expired_entries_are_gone() {
        let store = TransientStore::in_memory();
        store.set("short", &"value", Some(Duration::zero())).unwrap();
        store.set("long", &"value", Some(Duration::hours(1))).unwrap();

        assert_eq!(store.get::<String>("short"), None);
        assert_eq!(store.get::<String>("long").as_deref(), Some("value"));
    }

    #[test]
    fn persistent_entries_survive_a_new_store() {
        let dir = TempDir::new().unwrap();
        let store = TransientStore::persistent(dir.path().to_path_buf()).unwrap();
        store.set("catalog", &vec![1, 2, 3], Some(Duration::days(1))).unwrap();
        store.set("forever", &true, None).unwrap();

        let reopened = TransientStore::persistent(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get::<Vec<i32>>("catalog"), Some(vec![1, 2, 3]));
        assert_eq!(reopened.get::<bool>("forever"), Some(true));
    }

    #[test]
    fn delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = TransientStore::persistent(dir.path().to_path_buf()).unwrap();
        store.set("gone", &1u8, None).unwrap();
        assert!(dir.path().join("gone.json").exists());

        store.delete("gone");
        assert!(!dir.path().join("gone.json").exists());
        assert_eq!(store.get::<u8>("gone"), None);
    }

    #[test]
    fn wrong_shape_reads_as_missing() {
        let store = TransientStore::in_memory();
        store.set("k", &"text", None).unwrap();
        assert_eq!(store.get::<u32>("k"), None);
    }
}
