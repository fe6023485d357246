use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

/// Key/value storage scoped to the skill. Backs both host memory and the secret store.
///
/// Each `set` is atomic per key; the skill never needs multi-key transactions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a flat TOML table. Every `set` writes the whole file back.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Load the store from `path`, or start empty if the file doesn't exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                values: RwLock::default(),
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;

        let values: BTreeMap<String, String> = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse store file: {}", path.display()))?;

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(values)
            .context("Failed to serialize store to TOML")?;

        fs::write(&self.path, toml)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    /// The in-memory table only changes once the file write has succeeded.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);

        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.save(&updated)?;

        *values = updated;
        Ok(())
    }
}

/// Platform directory holding `memory.toml` and `secrets.toml` for the local host.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "weather-skill", "weather-skill")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

    Ok(dirs.config_dir().to_path_buf())
}

/// Read `key` and treat an empty string the same as a missing key.
pub(crate) fn get_non_empty(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    store.get(key).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_overwrites_values() {
        let store = MemoryStore::with_entries([("last_city", "Paris")]);
        assert_eq!(store.get("last_city").as_deref(), Some("Paris"));

        store.set("last_city", "Lyon").unwrap();
        assert_eq!(store.get("last_city").as_deref(), Some("Lyon"));
        assert_eq!(store.get("default_city"), None);
    }

    #[test]
    fn empty_values_read_as_missing() {
        let store = MemoryStore::with_entries([("default_city", "")]);
        assert_eq!(get_non_empty(&store, "default_city"), None);
    }

    #[test]
    fn file_store_starts_empty_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::load(dir.path().join("memory.toml")).unwrap();

        assert_eq!(store.get("api_entry_point"), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.toml");

        let store = FileStore::load(&path).unwrap();
        store.set("api_key", "abc123").unwrap();

        let reloaded = FileStore::load(&path).unwrap();
        assert_eq!(reloaded.get("api_key").as_deref(), Some("abc123"));
    }

    #[test]
    fn file_store_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.toml");
        fs::write(&path, "not = [valid").unwrap();

        let err = FileStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse store file"));
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let store = FileStore::load(blocker.join("secrets.toml")).unwrap();
        let err = store.set("api_key", "abc").unwrap_err();

        assert!(err.to_string().contains("Failed to create store directory"));
        assert_eq!(store.get("api_key"), None);
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.toml");

        let store = FileStore::load(&path).unwrap();
        store.set("last_city", "Paris").unwrap();

        // A directory where the file should be makes the write fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.set("last_city", "Lyon").is_err());
        assert_eq!(store.get("last_city").as_deref(), Some("Paris"));
    }
}
