//! Byte storage backends for config files.
//!
//! [`DiskStorage`] reads and writes real files. [`MemoryStorage`] keeps
//! everything in a map and is what the tests run against.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use homeshell_types::error::{LauncherError, Result};

/// A place config file bytes live.
pub trait ConfigStorage: Send + Sync {
    /// Read a whole file. Returns `Ok(None)` when the file does not exist.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Replace a whole file, creating it (and its parents) if needed.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

/// Storage backed by the real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStorage;

impl DiskStorage {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigStorage for DiskStorage {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LauncherError::file(path.display().to_string(), e)),
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        write_atomic(path, data).map_err(|e| LauncherError::file(path.display().to_string(), e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Write through a temporary sibling file so readers never see a partial file.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryFiles {
    files: BTreeMap<PathBuf, Vec<u8>>,
    read_only: bool,
    writes: usize,
}

/// A fully in-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryFiles>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one file.
    pub fn with_file(path: impl Into<PathBuf>, contents: &str) -> Self {
        let storage = Self::new();
        storage.insert(path, contents);
        storage
    }

    /// Put a file into the store without counting it as a write.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: &str) {
        self.lock()
            .files
            .insert(path.into(), contents.as_bytes().to_vec());
    }

    /// Current contents of a file as text.
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.lock()
            .files
            .get(path)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }

    /// Make every following write fail with a file error.
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryFiles> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStorage for MemoryStorage {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().files.get(path).cloned())
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.read_only {
            return Err(LauncherError::file(
                path.display().to_string(),
                "storage is read-only",
            ));
        }
        inner.files.insert(path.to_path_buf(), data.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_missing_is_none() {
        let storage = MemoryStorage::new();
        assert!(storage.read(Path::new("/nope.json")).unwrap().is_none());
        assert!(!storage.exists(Path::new("/nope.json")));
    }

    #[test]
    fn memory_write_and_read() {
        let storage = MemoryStorage::new();
        storage.write(Path::new("/cfg/apps.json"), b"{}").unwrap();
        assert_eq!(
            storage.read(Path::new("/cfg/apps.json")).unwrap().unwrap(),
            b"{}"
        );
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn memory_insert_is_not_a_write() {
        let storage = MemoryStorage::with_file("/a.json", "{\"x\": 1}");
        assert_eq!(storage.write_count(), 0);
        assert_eq!(
            storage.contents(Path::new("/a.json")).as_deref(),
            Some("{\"x\": 1}")
        );
    }

    #[test]
    fn memory_read_only_rejects_writes() {
        let storage = MemoryStorage::with_file("/a.json", "{}");
        storage.set_read_only(true);
        let err = storage.write(Path::new("/a.json"), b"[]").unwrap_err();
        assert!(err.is_file_error());
        assert_eq!(storage.contents(Path::new("/a.json")).as_deref(), Some("{}"));

        storage.set_read_only(false);
        storage.write(Path::new("/a.json"), b"[]").unwrap();
        assert_eq!(storage.contents(Path::new("/a.json")).as_deref(), Some("[]"));
    }

    #[test]
    fn disk_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config/apps.json");
        let storage = DiskStorage::new();
        assert!(!storage.exists(&path));
        storage.write(&path, b"{\"a\": true}").unwrap();
        assert!(storage.exists(&path));
        assert_eq!(storage.read(&path).unwrap().unwrap(), b"{\"a\": true}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn disk_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new();
        assert!(storage.read(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn disk_read_directory_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new();
        let err = storage.read(dir.path()).unwrap_err();
        assert!(err.is_file_error());
    }
}
