//! Byte-stream providers for report definitions.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use thiserror::Error;

/// Failure to open a definition stream.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing is stored under the key.
    #[error("no definition stored under '{0}'")]
    NotFound(String),

    /// The stream exists but could not be read.
    #[error("I/O error reading '{key}': {source}")]
    Io {
        /// Key being read.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Supplies readable streams for storage keys.
pub trait DefinitionStore: Send + Sync {
    /// Opens the stream stored under `key`.
    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError>;

    /// Reads the whole stream stored under `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut reader = self.open(key)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })?;
        Ok(bytes)
    }
}

/// Definitions held in memory, keyed exactly.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), bytes.into());
    }

    /// Stores an entry and returns the updated store.
    pub fn with(mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(key, bytes);
        self
    }
}

impl DefinitionStore for MemoryStore {
    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError> {
        self.entries
            .get(key)
            .map(|bytes| Box::new(Cursor::new(bytes.as_slice())) as Box<dyn Read + '_>)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// Definitions stored as files, one file per key, under a root directory.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DefinitionStore for DirectoryStore {
    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError> {
        if key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let path = self.root.join(key);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_reads_exact_keys() {
        let store = MemoryStore::new().with("Reports.Invoice.rdlc", "<Report/>");
        assert_eq!(store.read("Reports.Invoice.rdlc").unwrap(), b"<Report/>");
        assert!(matches!(
            store.read("reports.invoice.rdlc"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn directory_store_maps_missing_files_to_not_found() {
        let store = DirectoryStore::new(std::env::temp_dir());
        assert!(matches!(
            store.read("rdlc-generator-definitely-missing.rdlc"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.read("../etc/passwd"),
            Err(StoreError::NotFound(_))
        ));
    }
}
