//! Ledger error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or persisting a ledger document.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading the document or creating its directory failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document on disk is not a JSON object of records.
    #[error("Corrupt ledger {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The temporary file could not replace the document.
    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}
