//! Crawl engine: page through repository search and classify each hit.
//!
//! For every repository above the star threshold the engine makes sure the
//! ledger holds two searches: test directories (with their non-empty files)
//! and build configs. A search that already succeeded is not repeated, so a
//! restarted crawl picks up where the last one stopped. The ledger is saved
//! after every repository.

use chrono::Utc;
use harvest_config::CrawlConfig;
use harvest_core::entities::{RepoSnapshot, RepositoryRecord, TreeEntry};
use harvest_core::enums::EntryType;
use harvest_github::{GitHubError, RepositorySource, SearchQuery};
use harvest_ledger::RepositoryLedger;
use serde::Serialize;

use crate::error::PipelineError;
use crate::retry::FixedBackoff;

/// GitHub serves at most this many results per search, whatever
/// `total_count` says.
const SEARCH_RESULT_CAP: u64 = 1_000;

#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Repositories with fewer stars are skipped without any API call.
    pub star_threshold: u64,
    /// Repeat the test-directory search even where it already succeeded.
    pub force_refresh: bool,
    /// One paginated query per filter; empty means a single unfiltered query.
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub pages: usize,
    pub seen: usize,
    pub skipped_below_threshold: usize,
    pub inserted: usize,
    pub stars_updated: usize,
    pub test_searches: usize,
    pub config_searches: usize,
    pub failures: usize,
}

pub struct Crawler<S> {
    source: S,
    config: CrawlConfig,
    backoff: FixedBackoff,
}

impl<S: RepositorySource> Crawler<S> {
    #[must_use]
    pub fn new(source: S, config: CrawlConfig) -> Self {
        let backoff = FixedBackoff::from_config(&config);
        Self {
            source,
            config,
            backoff,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: FixedBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Run every configured query to the end, updating `ledger` as it goes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Ledger`] if the ledger cannot be saved. Host
    /// failures are logged and counted in [`CrawlSummary::failures`].
    pub async fn crawl(
        &self,
        options: &CrawlOptions,
        ledger: &mut RepositoryLedger,
    ) -> Result<CrawlSummary, PipelineError> {
        let mut summary = CrawlSummary::default();
        let filters: Vec<Option<&str>> = if options.filters.is_empty() {
            vec![None]
        } else {
            options.filters.iter().map(|f| Some(f.as_str())).collect()
        };

        for filter in filters {
            let mut query = SearchQuery::first_page(&self.config, filter);
            tracing::info!(q = %query.q(), "starting search");
            loop {
                let page = match self
                    .backoff
                    .run("repository search", || self.source.search_repos(&query))
                    .await
                {
                    Ok(page) => page,
                    Err(error) => {
                        tracing::error!(
                            q = %query.q(),
                            page = query.page,
                            %error,
                            "search failed, abandoning query"
                        );
                        summary.failures += 1;
                        break;
                    }
                };
                summary.pages += 1;
                tracing::info!(
                    page = query.page,
                    total = page.total_count,
                    items = page.items.len(),
                    "search page"
                );

                let exhausted = page.items.is_empty()
                    || query.is_last_page(page.total_count.min(SEARCH_RESULT_CAP));
                for snapshot in page.items {
                    self.visit(snapshot, options, ledger, &mut summary).await?;
                }
                if exhausted {
                    break;
                }
                query = query.with_page(query.page + 1);
            }
        }

        tracing::info!(?summary, "crawl finished");
        Ok(summary)
    }

    async fn visit(
        &self,
        snapshot: RepoSnapshot,
        options: &CrawlOptions,
        ledger: &mut RepositoryLedger,
        summary: &mut CrawlSummary,
    ) -> Result<(), PipelineError> {
        summary.seen += 1;
        let full_name = snapshot.full_name.clone();
        if snapshot.stargazers_count < options.star_threshold {
            tracing::debug!(
                repo = %full_name,
                stars = snapshot.stargazers_count,
                "below star threshold"
            );
            summary.skipped_below_threshold += 1;
            return Ok(());
        }

        let owner = snapshot.owner.login.clone();
        let name = snapshot.name.clone();
        let stars = snapshot.stargazers_count;

        match ledger.get_mut(&full_name) {
            Some(record) if record.repo.stargazers_count != stars => {
                tracing::debug!(
                    repo = %full_name,
                    from = record.repo.stargazers_count,
                    to = stars,
                    "star count changed"
                );
                record.repo.stargazers_count = stars;
                summary.stars_updated += 1;
                ledger.save()?;
            }
            Some(_) => {}
            None => {
                tracing::info!(repo = %full_name, stars, "new repository");
                ledger.insert(full_name.clone(), RepositoryRecord::new(snapshot));
                summary.inserted += 1;
                ledger.save()?;
            }
        }

        let (needs_tests, needs_configs) = ledger.get(&full_name).map_or((false, false), |r| {
            (
                options.force_refresh || r.test_trees.is_none(),
                r.truffle_trees.is_none(),
            )
        });

        if needs_tests {
            summary.test_searches += 1;
            match self.test_trees(&owner, &name).await {
                Ok(trees) => {
                    tracing::debug!(repo = %full_name, dirs = trees.len(), "test directories");
                    if let Some(record) = ledger.get_mut(&full_name) {
                        record.test_trees = Some(trees);
                    }
                }
                Err(error) => {
                    tracing::warn!(repo = %full_name, %error, "test directory search failed");
                    summary.failures += 1;
                }
            }
        }

        if needs_configs {
            summary.config_searches += 1;
            match self.build_configs(&owner, &name).await {
                Ok(configs) => {
                    tracing::debug!(repo = %full_name, configs = configs.len(), "build configs");
                    if let Some(record) = ledger.get_mut(&full_name) {
                        record.truffle_trees = Some(configs);
                        record.retrieved_at = Some(Utc::now());
                    }
                }
                Err(error) => {
                    tracing::warn!(repo = %full_name, %error, "build config search failed");
                    summary.failures += 1;
                }
            }
        }

        ledger.save()?;
        Ok(())
    }

    /// Test directories, each with its non-empty files as `children`.
    async fn test_trees(&self, owner: &str, name: &str) -> Result<Vec<TreeEntry>, GitHubError> {
        let dirs = self
            .backoff
            .run("test directory search", || {
                self.source.find_entries(
                    owner,
                    name,
                    &self.config.test_dir_names,
                    EntryType::Tree,
                    &self.config.vendor_dir,
                )
            })
            .await;
        let dirs = empty_repository_is_empty(dirs)?;

        let mut trees = Vec::with_capacity(dirs.len());
        for mut dir in dirs {
            let listing = self
                .backoff
                .run("test subtree", || self.source.get_tree(owner, name, &dir.sha))
                .await?;
            dir.children = Some(
                listing
                    .into_iter()
                    .filter(|entry| {
                        entry.entry_type == EntryType::Blob && entry.size.unwrap_or(0) > 0
                    })
                    .collect(),
            );
            trees.push(dir);
        }
        Ok(trees)
    }

    async fn build_configs(&self, owner: &str, name: &str) -> Result<Vec<TreeEntry>, GitHubError> {
        let configs = self
            .backoff
            .run("build config search", || {
                self.source.find_entries(
                    owner,
                    name,
                    &self.config.build_config_names,
                    EntryType::Blob,
                    &self.config.vendor_dir,
                )
            })
            .await;
        empty_repository_is_empty(configs)
    }
}

/// A repository without commits has nothing to find, which is a result.
fn empty_repository_is_empty(
    result: Result<Vec<TreeEntry>, GitHubError>,
) -> Result<Vec<TreeEntry>, GitHubError> {
    match result {
        Err(GitHubError::EmptyRepository { full_name }) => {
            tracing::debug!(repo = %full_name, "empty repository");
            Ok(Vec::new())
        }
        other => other,
    }
}
