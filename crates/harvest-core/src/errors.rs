//! Cross-cutting error types for harvest.
//!
//! Component errors (`GitHubError`, `LedgerError`, `PipelineError`) live in
//! their own crates and converge into `anyhow` in `harvest-cli`.

use thiserror::Error;

/// Errors that can be raised by any harvest crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ledger lookup returned no record.
    #[error("Record not found: {kind} {key}")]
    NotFound { kind: String, key: String },

    /// A value failed to parse into a domain type.
    #[error("Invalid {kind}: '{value}'")]
    InvalidValue { kind: String, value: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
