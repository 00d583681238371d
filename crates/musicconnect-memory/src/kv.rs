use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};

/// Synchronous string blob storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Keys become file names: ASCII alphanumerics, `_`, `-` and `.`, not leading with `.`.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !valid || key.starts_with('.') {
        bail!("invalid storage key: {key:?}");
    }
    Ok(())
}

impl KeyValueStore for FileKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create data dir: {}", self.dir.display()))?;

        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Process-local store; clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("failed to lock memory store"))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("failed to lock memory store"))?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_read_missing_key_is_none() -> Result<()> {
        let dir = TempDir::new()?;
        let store = FileKeyValueStore::new(dir.path());
        assert_eq!(store.read("saved")?, None);
        Ok(())
    }

    #[test]
    fn file_store_write_then_read() -> Result<()> {
        let dir = TempDir::new()?;
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        store.write("saved", "[1,2]")?;
        store.write("saved", "[3]")?;

        assert_eq!(store.read("saved")?.as_deref(), Some("[3]"));
        assert!(dir.path().join("nested").join("saved.json").exists());
        assert!(!dir.path().join("nested").join("saved.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        for key in ["", "../escape", "a/b", ".hidden"] {
            let err = store.write(key, "x").unwrap_err();
            assert!(err.to_string().contains("invalid storage key"), "{key}");
        }
    }

    #[test]
    fn memory_store_clones_share_entries() -> Result<()> {
        let store = MemoryKeyValueStore::new();
        let other = store.clone();
        store.write("k", "v")?;
        assert_eq!(other.read("k")?.as_deref(), Some("v"));
        assert_eq!(other.read("missing")?, None);
        Ok(())
    }
}
