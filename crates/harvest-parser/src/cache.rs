//! Per-path memo of parsed directives.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ParserError;
use crate::pragma::{PragmaDirective, parse_pragmas};

/// Parsed directives keyed by file path, kept for the process lifetime.
///
/// Several projects of one repository often share a `contracts/` tree, so
/// each file is read and scanned at most once. Failures are not cached.
#[derive(Debug, Default)]
pub struct PragmaCache {
    entries: HashMap<PathBuf, Vec<PragmaDirective>>,
}

impl PragmaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directives of the file at `path`, reading and parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError::Io`] if the file cannot be read, or the scan
    /// error if it cannot be parsed.
    pub fn directives(&mut self, path: &Path) -> Result<&[PragmaDirective], ParserError> {
        if !self.entries.contains_key(path) {
            let source = fs::read_to_string(path).map_err(|source| ParserError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let parsed = parse_pragmas(&source)?;
            tracing::trace!(path = %path.display(), count = parsed.len(), "parsed pragmas");
            self.entries.insert(path.to_path_buf(), parsed);
        }
        Ok(self.entries.get(path).map_or(&[][..], Vec::as_slice))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
