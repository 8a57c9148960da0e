//! Durable key/value storage port and its backends.

use std::{collections::HashMap, error, fmt, fs, io, path::PathBuf};

use log::debug;

use crate::db_manager::DbManager;

#[derive(Debug)]
pub enum StorageError {
    /// Key cannot be mapped onto the backend (e.g. path separators in a file name).
    InvalidKey(String),
    /// Backend was configured but could not be reached.
    Unavailable(String),
    Io(io::Error),
    Database(rusqlite::Error),
}

impl error::Error for StorageError {}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "Invalid storage key '{key}'"),
            Self::Unavailable(reason) => write!(f, "Storage unavailable: {reason}"),
            Self::Io(err) => err.fmt(f),
            Self::Database(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> StorageError {
        StorageError::Io(err)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> StorageError {
        StorageError::Database(err)
    }
}

/// Synchronous string storage keyed by name.
///
/// `write` replaces the whole value for a key; readers never observe a
/// partially written value.
pub trait KeyValueStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value)
    }
}

/// Process-local storage. Contents vanish with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut storage = Self::new();
        storage.values.insert(key.to_string(), value.to_string());
        storage
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn is_valid_file_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

/// Stores each key as `<key>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root_dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn value_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_file_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.value_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.value_path(key)?;
        fs::create_dir_all(&self.root_dir)?;
        // Write beside the target and rename so readers see old or new, never half.
        let staging_path = self.root_dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging_path, value)?;
        if let Err(err) = fs::rename(&staging_path, &path) {
            let _ = fs::remove_file(&staging_path);
            return Err(err.into());
        }
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

impl KeyValueStorage for DbManager {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_value(key)?)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.put_value(key, value)?)
    }
}
