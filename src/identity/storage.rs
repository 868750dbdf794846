//! Durable client storage for the bearer token.
//! The token lives as a single string under `ACCESS_TOKEN_KEY`; absence means signed out.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{AppError, AppResult};

pub const ACCESS_TOKEN_KEY: &str = "access_token";

pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn with_value(key: &str, value: &str) -> Self {
        let s = Self::default();
        s.values.lock().insert(key.to_string(), value.to_string());
        s
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> { Ok(self.values.lock().get(key).cloned()) }
    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
    fn remove(&self, key: &str) -> AppResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// JSON object file, rewritten whole through a temp file + rename on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self { Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) } }

    pub fn path(&self) -> &Path { &self.path }

    fn read_map(&self) -> BTreeMap<String, String> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(target: "postboard::session", "storage unreadable at {}: {}", self.path.display(), e);
                return BTreeMap::new();
            }
        };
        if text.trim().is_empty() { return BTreeMap::new(); }
        match serde_json::from_str::<BTreeMap<String, String>>(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(target: "postboard::session", "storage corrupt at {}, treating as empty: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let tmp = self.path.with_extension("tmp");
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| AppError::internal("storage_encode".to_string(), e.to_string()))?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let _g = self.lock.lock();
        Ok(self.read_map().remove(key))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let _g = self.lock.lock();
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let _g = self.lock.lock();
        let mut map = self.read_map();
        if map.remove(key).is_none() { return Ok(()); }
        self.write_map(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_roundtrip_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FileStorage::new(tmp.path().join("nested").join("storage.json"));
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap(), None);
        s.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        s.set("other", "keep").unwrap();
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        // a second handle on the same file sees the value
        let again = FileStorage::new(s.path());
        assert_eq!(again.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        s.remove(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(s.get("other").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn removing_missing_key_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FileStorage::new(tmp.path().join("storage.json"));
        s.remove(ACCESS_TOKEN_KEY).unwrap();
        assert!(!s.path().exists());
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();
        let s = FileStorage::new(&path);
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap(), None);
        s.set(ACCESS_TOKEN_KEY, "t").unwrap();
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn memory_storage_basics() {
        let s = MemoryStorage::with_value(ACCESS_TOKEN_KEY, "x");
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("x"));
        s.remove(ACCESS_TOKEN_KEY).unwrap();
        s.remove(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(s.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }
}
