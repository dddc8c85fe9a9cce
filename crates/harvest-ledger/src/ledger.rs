//! Generic keyed JSON document with whole-file atomic rewrites.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::LedgerError;

/// How the document is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Two-space indented, for documents people read by hand.
    Pretty,
    /// Single line, for documents rewritten on every output chunk.
    Compact,
}

/// A JSON object of records keyed by string, kept in insertion order.
///
/// The in-memory map is the working copy; [`JsonLedger::save`] replaces the
/// file wholesale through a temporary file in the same directory, so readers
/// see either the previous or the new document and never a partial one.
/// Entries are never removed.
#[derive(Debug)]
pub struct JsonLedger<T> {
    path: PathBuf,
    layout: Layout,
    records: IndexMap<String, T>,
}

impl<T> JsonLedger<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load the document at `path`, or start empty if it does not exist.
    ///
    /// Creates the parent directory so the first [`JsonLedger::save`] succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the directory or file cannot be
    /// accessed, and [`LedgerError::Corrupt`] if the file is not a JSON object
    /// of records.
    pub fn open(path: impl Into<PathBuf>, layout: Layout) -> Result<Self, LedgerError> {
        let path = path.into();
        let dir = parent_dir(&path);
        fs::create_dir_all(dir).map_err(|source| LedgerError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let records = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| LedgerError::Io {
                path: path.clone(),
                source,
            })?;
            if text.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_json::from_str(&text).map_err(|source| LedgerError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            IndexMap::new()
        };

        tracing::debug!(path = %path.display(), records = records.len(), "ledger opened");
        Ok(Self {
            path,
            layout,
            records,
        })
    }

    /// Write the whole document and atomically replace the file.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization, the temporary write, or the
    /// final rename fails. The previous document is left intact on error.
    pub fn save(&self) -> Result<(), LedgerError> {
        let bytes = match self.layout {
            Layout::Pretty => serde_json::to_vec_pretty(&self.records)?,
            Layout::Compact => serde_json::to_vec(&self.records)?,
        };

        let dir = parent_dir(&self.path);
        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path)
            .map_err(|source| LedgerError::Persist {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}

impl<T> JsonLedger<T> {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.records.get_mut(key)
    }

    /// Record at insertion position `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<(&str, &T)> {
        self.records
            .get_index(index)
            .map(|(key, record)| (key.as_str(), record))
    }

    /// Insertion position of `key`.
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.records.get_index_of(key)
    }

    /// Insert or replace. A replaced record keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, record: T) -> Option<T> {
        self.records.insert(key.into(), record)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
