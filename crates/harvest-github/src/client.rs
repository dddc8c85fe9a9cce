//! `reqwest`-backed [`RepositorySource`] for the GitHub REST API.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use harvest_config::GitHubConfig;
use harvest_core::entities::TreeEntry;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::GitHubError;
use crate::http::check_response;
use crate::source::{RepositorySource, SearchPage, SearchQuery};

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// HTTP client for the GitHub search, commits, and git-trees endpoints.
///
/// Last-commit SHAs are cached per `owner/repo` for the lifetime of the
/// client, so the test-directory and build-config searches of one repository
/// share a single commits request.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    last_commits: Mutex<HashMap<String, String>>,
}

impl GitHubClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Config`] if the token is not a valid header
    /// value, or [`GitHubError::Http`] if the TLS backend fails to start.
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if config.is_configured() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
                .map_err(|e| GitHubError::Config(format!("token is not a valid header: {e}")))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        } else {
            tracing::warn!("no GitHub token configured, search rate limits will be low");
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            last_commits: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GitHubError> {
        tracing::debug!(%url, "GET");
        let resp = check_response(self.http.get(url).send().await?).await?;
        let body = resp.text().await?;
        parse_body(&body)
    }

    fn cached_commit(&self, full_name: &str) -> Option<String> {
        self.last_commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_name)
            .cloned()
    }

    fn cache_commit(&self, full_name: String, sha: String) {
        self.last_commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_name, sha);
    }
}

impl RepositorySource for GitHubClient {
    async fn search_repos(&self, query: &SearchQuery) -> Result<SearchPage, GitHubError> {
        let url = format!(
            "{}/search/repositories?q={}&sort={}&order={}&per_page={}&page={}",
            self.api_url,
            query.encoded_q(),
            urlencoding::encode(&query.sort),
            urlencoding::encode(&query.order),
            query.per_page,
            query.page,
        );
        let page: SearchPage = self.get_json(&url).await?;
        if page.incomplete_results {
            tracing::warn!(q = %query.q(), page = query.page, "search results incomplete");
        }
        Ok(page)
    }

    async fn last_commit(&self, owner: &str, repo: &str) -> Result<String, GitHubError> {
        let full_name = format!("{owner}/{repo}");
        if let Some(sha) = self.cached_commit(&full_name) {
            return Ok(sha);
        }

        let url = format!(
            "{}/repos/{}/{}/commits?per_page=1",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
        );
        let commits: Vec<CommitItem> = match self.get_json(&url).await {
            Err(GitHubError::Api { status: 409, .. }) => {
                return Err(GitHubError::EmptyRepository { full_name });
            }
            other => other?,
        };
        let sha = newest_sha(commits, &full_name)?;
        self.cache_commit(full_name, sha.clone());
        Ok(sha)
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<TreeEntry>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(sha),
        );
        let response: TreeResponse = self.get_json(&url).await?;
        checked_tree(response, &format!("{owner}/{repo}"), sha)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, GitHubError> {
    serde_json::from_str(body).map_err(|e| GitHubError::Parse(e.to_string()))
}

fn newest_sha(commits: Vec<CommitItem>, full_name: &str) -> Result<String, GitHubError> {
    commits
        .into_iter()
        .next()
        .map(|commit| commit.sha)
        .ok_or_else(|| GitHubError::EmptyRepository {
            full_name: full_name.to_owned(),
        })
}

fn checked_tree(
    response: TreeResponse,
    full_name: &str,
    sha: &str,
) -> Result<Vec<TreeEntry>, GitHubError> {
    if response.truncated {
        return Err(GitHubError::TruncatedTree {
            full_name: full_name.to_owned(),
            sha: sha.to_owned(),
        });
    }
    Ok(response.tree)
}

#[cfg(test)]
mod tests {
    use harvest_core::enums::EntryType;

    use super::*;

    const SEARCH_FIXTURE: &str = include_str!("../tests/fixtures/search_page.json");
    const TREE_FIXTURE: &str = include_str!("../tests/fixtures/tree.json");

    #[test]
    fn parse_search_page_fixture() {
        let page: SearchPage = parse_body(SEARCH_FIXTURE).unwrap();
        assert_eq!(page.total_count, 2);
        assert!(!page.incomplete_results);
        assert_eq!(page.items.len(), 2);
        let first = &page.items[0];
        assert_eq!(first.full_name, "OpenZeppelin/openzeppelin-contracts");
        assert_eq!(first.owner.login, "OpenZeppelin");
        assert_eq!(first.stargazers_count, 25_000);
        assert!(first.pushed_at.is_some());
        assert!(page.items[1].description.is_none());
    }

    #[test]
    fn parse_tree_fixture() {
        let response: TreeResponse = parse_body(TREE_FIXTURE).unwrap();
        let tree = checked_tree(response, "acme/token", "abc").unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree[0].entry_type, EntryType::Tree);
        assert_eq!(tree[2].size, Some(0));
    }

    #[test]
    fn truncated_tree_is_an_error() {
        let response = TreeResponse {
            tree: Vec::new(),
            truncated: true,
        };
        let err = checked_tree(response, "acme/huge", "abc").unwrap_err();
        assert!(matches!(err, GitHubError::TruncatedTree { .. }));
    }

    #[test]
    fn empty_commit_list_is_empty_repository() {
        let commits: Vec<CommitItem> = parse_body("[]").unwrap();
        let err = newest_sha(commits, "acme/empty").unwrap_err();
        assert!(matches!(err, GitHubError::EmptyRepository { .. }));
    }

    #[test]
    fn newest_sha_takes_first_commit() {
        let commits: Vec<CommitItem> =
            parse_body(r#"[{"sha": "c2", "commit": {}}, {"sha": "c1"}]"#).unwrap();
        assert_eq!(newest_sha(commits, "acme/token").unwrap(), "c2");
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = parse_body::<SearchPage>("{\"message\": \"nope\"}").unwrap_err();
        assert!(matches!(err, GitHubError::Parse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn client_builds_without_token() {
        let client = GitHubClient::new(&GitHubConfig::default()).unwrap();
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[test]
    fn commit_cache_is_keyed_by_full_name() {
        let client = GitHubClient::new(&GitHubConfig::default()).unwrap();
        client.cache_commit("acme/token".into(), "c9".into());
        assert_eq!(client.cached_commit("acme/token").as_deref(), Some("c9"));
        assert!(client.cached_commit("acme/other").is_none());
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn search_live_api() {
        let client = GitHubClient::new(&GitHubConfig::default()).unwrap();
        let query = SearchQuery::first_page(&harvest_config::CrawlConfig::default(), None);
        let page = client.search_repos(&query).await.unwrap();
        assert!(page.total_count > 0);
    }
}
