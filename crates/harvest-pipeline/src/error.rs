//! Pipeline error types.
//!
//! Only failures that make the whole batch pointless surface as
//! [`PipelineError`]. Per-repository and per-project failures are logged,
//! counted in the returned summary, and recorded on the ledger entry.

use std::path::PathBuf;

use harvest_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The ledger could not be persisted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A child process could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project key or index did not resolve to a ledger entry.
    #[error("Unknown project: {0}")]
    UnknownProject(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
