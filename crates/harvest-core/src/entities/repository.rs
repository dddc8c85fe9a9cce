use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::EntryType;

/// Owner of a hosted repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoOwner {
    pub login: String,
}

/// Snapshot of upstream repository metadata, as returned by the search API.
///
/// Field names follow the GitHub payload so ledgers stay readable next to raw
/// API responses. Only `stargazers_count` is ever updated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    pub clone_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub stargazers_count: u64,
    /// Repository size in KB.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A node in a git tree listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub sha: String,
    /// Blob size in bytes. Absent for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Files found under this directory (test directories only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

impl TreeEntry {
    /// Last path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Crawl state for one repository, keyed by `owner/name` in the ledger.
///
/// `test_trees` and `truffle_trees` are tri-state: `None` means the search has
/// not succeeded yet (the field is absent from the JSON), `Some(vec![])` means
/// it ran and found nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub repo: RepoSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_trees: Option<Vec<TreeEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truffle_trees: Option<Vec<TreeEntry>>,
    /// When the build-config search last succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl RepositoryRecord {
    /// A freshly sighted repository with no searches performed.
    #[must_use]
    pub const fn new(repo: RepoSnapshot) -> Self {
        Self {
            repo,
            test_trees: None,
            truffle_trees: None,
            retrieved_at: None,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.repo.full_name
    }

    /// At least one `test`/`tests` directory was found.
    #[must_use]
    pub fn is_testable(&self) -> bool {
        self.test_trees.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// At least one build-config file was found.
    #[must_use]
    pub fn is_truffled(&self) -> bool {
        self.truffle_trees.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Qualifies for cloning and building.
    #[must_use]
    pub fn is_truffled_testable(&self) -> bool {
        self.is_testable() && self.is_truffled()
    }

    /// Build-config entries, empty when not yet searched.
    #[must_use]
    pub fn build_configs(&self) -> &[TreeEntry] {
        self.truffle_trees.as_deref().unwrap_or_default()
    }
}
