//! GitHub client error types.

use thiserror::Error;

/// Errors that can occur when talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP transport error (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// A response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// 429, or 403 with an exhausted rate-limit budget.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The recursive tree listing exceeded GitHub's size limit.
    #[error("tree {sha} of {full_name} is truncated")]
    TruncatedTree { full_name: String, sha: String },

    /// The repository has no commits.
    #[error("repository {full_name} is empty")]
    EmptyRepository { full_name: String },

    /// The client could not be built from configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl GitHubError {
    /// Worth one more attempt after a pause.
    ///
    /// Rate limits, server errors, and transport failures are transient.
    /// Client errors and shape problems are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_)
            | Self::TruncatedTree { .. }
            | Self::EmptyRepository { .. }
            | Self::Config(_) => false,
        }
    }
}
