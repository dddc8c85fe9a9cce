//! # harvest-github
//!
//! Rate-aware GitHub REST client.
//!
//! The crawl engine depends only on the [`RepositorySource`] trait:
//! - `search_repos`: one page of `GET /search/repositories`
//! - `last_commit`: newest commit SHA, cached per repository
//! - `get_tree`: recursive `GET /git/trees/{sha}`
//! - `find_entries`: last commit → tree → name/type filter
//!
//! Failures come back as [`GitHubError`]; callers decide whether to retry via
//! [`GitHubError::is_transient`].

mod client;
mod error;
mod http;
mod source;

pub use client::GitHubClient;
pub use error::GitHubError;
pub use source::{RepositorySource, SearchPage, SearchQuery, select_entries};
