//! The collaborator seam between the crawl engine and a repository host.

use harvest_config::CrawlConfig;
use harvest_core::entities::{RepoSnapshot, TreeEntry};
use harvest_core::enums::EntryType;
use serde::Deserialize;

use crate::error::GitHubError;

/// Parameters of one repository search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub language: String,
    pub sort: String,
    pub order: String,
    pub per_page: u32,
    /// 1-based page number.
    pub page: u32,
    /// Extra qualifier appended to `q`, e.g. `created:<2019-01-01`.
    pub extra_filter: Option<String>,
}

impl SearchQuery {
    /// First page of the search described by `config`.
    #[must_use]
    pub fn first_page(config: &CrawlConfig, extra_filter: Option<&str>) -> Self {
        Self {
            language: config.language.clone(),
            sort: config.sort.clone(),
            order: config.order.clone(),
            per_page: config.per_page,
            page: 1,
            extra_filter: extra_filter.map(str::to_owned),
        }
    }

    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    fn qualifiers(&self) -> Vec<String> {
        let mut parts = vec![format!("language:{}", self.language), "is:public".to_owned()];
        if let Some(filter) = self.extra_filter.as_deref().filter(|f| !f.trim().is_empty()) {
            parts.push(filter.trim().to_owned());
        }
        parts
    }

    /// The `q` parameter as GitHub documents it: qualifiers joined by `+`.
    #[must_use]
    pub fn q(&self) -> String {
        self.qualifiers().join("+")
    }

    /// `q` with each qualifier percent-encoded. The `+` separators decode to
    /// spaces on the server.
    #[must_use]
    pub fn encoded_q(&self) -> String {
        self.qualifiers()
            .iter()
            .map(|part| urlencoding::encode(part).into_owned())
            .collect::<Vec<_>>()
            .join("+")
    }

    /// True once this page reaches or passes the end of the result set.
    #[must_use]
    pub fn is_last_page(&self, total_count: u64) -> bool {
        u64::from(self.page) * u64::from(self.per_page) >= total_count
    }
}

/// One page of repository search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RepoSnapshot>,
}

/// A host that can be searched for repositories and whose trees can be listed.
///
/// Implemented by [`crate::GitHubClient`]; tests substitute an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait RepositorySource {
    /// Fetch one page of repository search results.
    async fn search_repos(&self, query: &SearchQuery) -> Result<SearchPage, GitHubError>;

    /// SHA of the most recent commit on the default branch.
    async fn last_commit(&self, owner: &str, repo: &str) -> Result<String, GitHubError>;

    /// Recursive listing of the tree `sha`.
    ///
    /// A listing GitHub reports as truncated is an error, never a partial
    /// result.
    async fn get_tree(&self, owner: &str, repo: &str, sha: &str)
    -> Result<Vec<TreeEntry>, GitHubError>;

    /// Entries of `entry_type` named one of `names`, anywhere in the tree of
    /// the last commit, outside `vendor_dir`.
    async fn find_entries(
        &self,
        owner: &str,
        repo: &str,
        names: &[String],
        entry_type: EntryType,
        vendor_dir: &str,
    ) -> Result<Vec<TreeEntry>, GitHubError> {
        let sha = self.last_commit(owner, repo).await?;
        let tree = self.get_tree(owner, repo, &sha).await?;
        Ok(select_entries(tree, names, entry_type, vendor_dir))
    }
}

/// Filter a tree listing down to entries of `entry_type` whose path equals a
/// name or ends with `/{name}`, dropping anything under `vendor_dir`.
#[must_use]
pub fn select_entries(
    tree: Vec<TreeEntry>,
    names: &[String],
    entry_type: EntryType,
    vendor_dir: &str,
) -> Vec<TreeEntry> {
    tree.into_iter()
        .filter(|entry| entry.entry_type == entry_type)
        .filter(|entry| names.iter().any(|name| entry.file_name() == name))
        .filter(|entry| {
            let vendored =
                !vendor_dir.is_empty() && entry.path.split('/').any(|seg| seg == vendor_dir);
            if vendored {
                tracing::debug!(path = %entry.path, "excluding vendored entry");
            }
            !vendored
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(path: &str, entry_type: EntryType) -> TreeEntry {
        TreeEntry {
            path: path.into(),
            mode: None,
            entry_type,
            sha: format!("sha-{path}"),
            size: None,
            url: None,
            children: None,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn q_joins_qualifiers_with_plus() {
        let query = SearchQuery::first_page(&CrawlConfig::default(), Some("created:<2019-01-01"));
        assert_eq!(query.q(), "language:Solidity+is:public+created:<2019-01-01");
        assert_eq!(
            query.encoded_q(),
            "language%3ASolidity+is%3Apublic+created%3A%3C2019-01-01"
        );
    }

    #[test]
    fn blank_filter_is_dropped() {
        let query = SearchQuery::first_page(&CrawlConfig::default(), Some("  "));
        assert_eq!(query.q(), "language:Solidity+is:public");
    }

    #[test]
    fn last_page_detection() {
        let query = SearchQuery::first_page(&CrawlConfig::default(), None);
        assert!(!query.is_last_page(250));
        assert!(!query.with_page(2).is_last_page(250));
        assert!(query.with_page(3).is_last_page(250));
        assert!(query.is_last_page(0));
    }

    #[test]
    fn selects_matching_names_at_any_depth() {
        let tree = vec![
            entry("truffle.js", EntryType::Blob),
            entry("packages/core/truffle-config.js", EntryType::Blob),
            entry("docs/not-truffle.js", EntryType::Blob),
            entry("truffle.js.bak", EntryType::Blob),
        ];
        let found = select_entries(
            tree,
            &names(&["truffle.js", "truffle-config.js"]),
            EntryType::Blob,
            "node_modules",
        );
        let paths: Vec<_> = found.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["truffle.js", "packages/core/truffle-config.js"]);
    }

    #[test]
    fn excludes_vendor_paths_and_wrong_types() {
        let tree = vec![
            entry("test", EntryType::Tree),
            entry("node_modules/zeppelin/test", EntryType::Tree),
            entry("lib/test", EntryType::Blob),
            entry("contracts/tests", EntryType::Tree),
        ];
        let found = select_entries(
            tree,
            &names(&["test", "tests"]),
            EntryType::Tree,
            "node_modules",
        );
        let paths: Vec<_> = found.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["test", "contracts/tests"]);
    }
}
