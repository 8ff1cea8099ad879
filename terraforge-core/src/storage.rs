//! # Key-value storage
//!
//! The raw local store underneath history and drafts. Values are opaque
//! strings (JSON text in practice); decoding is the caller's business, so a
//! corrupt value is still readable here and can be reported upstream.

use crate::error::{self, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage backend trait
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
    fn keys(&self) -> Vec<String>;
    fn clear(&mut self) -> Result<()>;

    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

/// In-memory storage (volatile, used by tests and throwaway sessions)
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<()> {
        self.data.clear();
        Ok(())
    }
}

/// File-based storage: one `<key>.json` file per key
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)
            .map_err(|e| error::io_error(base_path.display().to_string(), e))?;
        Ok(Self { base_path })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.base_path.join(format!("{}.json", safe_key))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.key_to_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(error::io_error(key, e).with_operation("file_storage::get")),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_to_path(key);
        // write-then-rename so a crash never leaves a half-written list
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .map_err(|e| error::io_error(key, e).with_operation("file_storage::set"))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| error::io_error(key, e).with_operation("file_storage::set"))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.key_to_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(error::io_error(key, e).with_operation("file_storage::delete")),
        }
    }

    fn keys(&self) -> Vec<String> {
        std::fs::read_dir(&self.base_path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let path = e.path();
                        if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                            path.file_stem()
                                .and_then(|s| s.to_str())
                                .map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear(&mut self) -> Result<()> {
        for key in self.keys() {
            self.delete(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();

        storage.set("key1", "\"value1\"").unwrap();
        storage.set("key2", "42").unwrap();

        assert_eq!(storage.get("key1").unwrap().as_deref(), Some("\"value1\""));
        assert_eq!(storage.get("key2").unwrap().as_deref(), Some("42"));
        assert_eq!(storage.get("key3").unwrap(), None);
        assert!(storage.exists("key2"));

        storage.delete("key1").unwrap();
        assert_eq!(storage.get("key1").unwrap(), None);

        storage.clear().unwrap();
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path().join("data")).unwrap();

        storage.set("terraforge_history_v1", "[]").unwrap();
        assert_eq!(storage.get("terraforge_history_v1").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("data/terraforge_history_v1.json").exists());
        assert_eq!(storage.keys(), vec!["terraforge_history_v1".to_string()]);

        // survives reopening
        let reopened = FileStorage::new(dir.path().join("data")).unwrap();
        assert_eq!(reopened.get("terraforge_history_v1").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.get("absent").unwrap(), None);
        // deleting something that is not there is fine
        storage.delete("absent").unwrap();

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.clear().unwrap();
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        storage.set("ns:key/with*chars", "{}").unwrap();
        assert!(dir.path().join("ns_key_with_chars.json").exists());
        assert_eq!(storage.get("ns:key/with*chars").unwrap().as_deref(), Some("{}"));
    }
}
