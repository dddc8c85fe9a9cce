//! Pipeline stages, tree-entry kinds, and classification policies.
//!
//! All enums use `snake_case` serialization so they read naturally in the
//! ledger JSON and in TOML configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the external build pipeline.
///
/// ```text
/// compile → migrate → test
/// ```
///
/// Each stage may only run once its precondition stage has a recorded exit
/// code of zero. The precondition is checked against the persisted ledger,
/// never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Compile,
    Migrate,
    Test,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 3] = [Self::Compile, Self::Migrate, Self::Test];

    /// The stage that must have succeeded before this one may run.
    #[must_use]
    pub const fn default_precondition(self) -> Option<Self> {
        match self {
            Self::Compile => None,
            Self::Migrate => Some(Self::Compile),
            Self::Test => Some(Self::Migrate),
        }
    }

    /// Argument passed to the build tool (`truffle compile`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Migrate => "migrate",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" => Ok(Self::Compile),
            "migrate" => Ok(Self::Migrate),
            "test" => Ok(Self::Test),
            _ => Err(CoreError::InvalidValue {
                kind: "stage".into(),
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// EntryType
// ---------------------------------------------------------------------------

/// Kind of node in a git tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// A directory.
    Tree,
    /// A file.
    Blob,
    /// A submodule pointer.
    Commit,
}

impl EntryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ZeroTestsPolicy
// ---------------------------------------------------------------------------

/// How to classify test output that reports `0 passing` and no failing line.
///
/// The build tool prints `0 passing` both when a project has no test cases and
/// in some runs that aborted before loading them, so the output alone does not
/// say whether the test stage really ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroTestsPolicy {
    /// Treat it exactly like output with no summary at all.
    #[default]
    NotExecuted,
    /// Treat it as a completed run with zero cases.
    Executed,
}

impl ZeroTestsPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotExecuted => "not_executed",
            Self::Executed => "executed",
        }
    }
}

impl fmt::Display for ZeroTestsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
