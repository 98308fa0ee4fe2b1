//! Key-value media the store persists into.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::StoreError;

/// A durable string-to-string medium, such as browser local storage or a
/// directory of JSON files.
pub trait KeyValueMedium {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`; durable once this returns `Ok`.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local medium. Lives as long as the value does.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    entries: HashMap<String, String>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any store.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueMedium for MemoryMedium {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader sees either the old or the new mapping, never a torn one.
#[derive(Debug, Clone)]
pub struct DirectoryMedium {
    dir: PathBuf,
}

impl DirectoryMedium {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(key: &str, err: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        message: err.to_string(),
    }
}

impl KeyValueMedium for DirectoryMedium {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key, err)),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;

        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        // Data reaches disk before the rename publishes it
        let mut file = fs::File::create(&tmp).map_err(|e| io_error(key, e))?;
        file.write_all(value.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| io_error(key, e))?;
        drop(file);
        fs::rename(&tmp, &target).map_err(|e| io_error(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_medium_round_trip() {
        let mut medium = MemoryMedium::new();
        assert_eq!(medium.read("cropHistory").unwrap(), None);
        medium.write("cropHistory", "{}").unwrap();
        assert_eq!(medium.read("cropHistory").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_directory_medium_creates_dir_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");
        let mut medium = DirectoryMedium::new(&dir);

        assert_eq!(medium.read("imageRotations").unwrap(), None);
        medium.write("imageRotations", r#"{"a.jpg":90}"#).unwrap();

        let on_disk = fs::read_to_string(dir.join("imageRotations.json")).unwrap();
        assert_eq!(on_disk, r#"{"a.jpg":90}"#);
        assert!(!dir.join(".imageRotations.json.tmp").exists());
    }

    #[test]
    fn test_directory_medium_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let mut medium = DirectoryMedium::new(tmp.path());
        medium.write("k", "1").unwrap();
        medium.write("k", "2").unwrap();
        assert_eq!(medium.read("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_directory_medium_replaces_stale_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        // Left behind by an interrupted write, longer than the new value
        fs::write(tmp.path().join(".cropHistory.json.tmp"), "{\"stale\":true}").unwrap();

        let mut medium = DirectoryMedium::new(tmp.path());
        medium.write("cropHistory", "{}").unwrap();

        assert_eq!(medium.read("cropHistory").unwrap().as_deref(), Some("{}"));
        assert!(!tmp.path().join(".cropHistory.json.tmp").exists());
    }
}
