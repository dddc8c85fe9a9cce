//! Clone qualifying repositories and install their npm dependencies.

use std::fs;
use std::path::Path;

use chrono::Utc;
use harvest_config::PipelineConfig;
use harvest_core::entities::{InstallRun, RepositoryRecord};
use harvest_ledger::{ProjectLedger, RepositoryLedger, qualifying};
use serde::Serialize;

use crate::error::PipelineError;
use crate::layout;
use crate::process::{CommandSpec, ExitInfo, run_logged};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub repos: usize,
    pub cloned: usize,
    pub already_cloned: usize,
    pub clone_failures: usize,
    pub projects_registered: usize,
    pub installed: usize,
    pub install_skipped: usize,
    pub install_failures: usize,
}

pub struct Installer {
    config: PipelineConfig,
}

impl Installer {
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Clone and install qualifying repositories, starting at position
    /// `start_index` of the qualifying list. Only that one repository is
    /// processed unless `continue_to_next` is set.
    ///
    /// A `git` or package-manager run that fails, or cannot be started at all,
    /// is logged and counted; the batch moves on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Ledger`] if the project ledger cannot be
    /// saved.
    pub async fn clone_and_install(
        &self,
        repos: &RepositoryLedger,
        projects: &mut ProjectLedger,
        start_index: usize,
        continue_to_next: bool,
    ) -> Result<InstallSummary, PipelineError> {
        let mut summary = InstallSummary::default();
        let limit = if continue_to_next { usize::MAX } else { 1 };

        for repo in qualifying(repos).into_iter().skip(start_index).take(limit) {
            summary.repos += 1;
            if !self.ensure_clone(repo, &mut summary).await {
                continue;
            }

            let before = projects.len();
            let keys = layout::register_repository(projects, &self.config.clone_dir, repo);
            let added = projects.len() - before;
            if added > 0 {
                summary.projects_registered += added;
                projects.save()?;
            }

            for key in keys {
                self.install(&key, projects, &mut summary).await?;
            }
        }

        tracing::info!(?summary, "clone and install finished");
        Ok(summary)
    }

    /// `true` once the repository is on disk.
    async fn ensure_clone(&self, repo: &RepositoryRecord, summary: &mut InstallSummary) -> bool {
        let full_name = repo.full_name();
        let target = layout::repo_dir(&self.config.clone_dir, full_name);
        if target.exists() {
            tracing::debug!(repo = %full_name, "already cloned");
            summary.already_cloned += 1;
            return true;
        }

        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        if let Err(error) = fs::create_dir_all(parent) {
            tracing::warn!(
                repo = %full_name,
                dir = %parent.display(),
                %error,
                "cannot create clone dir"
            );
            summary.clone_failures += 1;
            return false;
        }
        let dir_name = target
            .file_name()
            .map_or_else(|| full_name.into(), |name| name.to_string_lossy());

        tracing::info!(repo = %full_name, url = %repo.repo.clone_url, "cloning");
        let spec = CommandSpec::new(&self.config.git, parent)
            .arg("clone")
            .arg(&repo.repo.clone_url)
            .arg(dir_name);
        match run_logged(&spec, full_name).await {
            Ok(exit) if exit.success() => {
                summary.cloned += 1;
                true
            }
            Ok(exit) => {
                tracing::warn!(
                    repo = %full_name,
                    code = ?exit.code,
                    signal = ?exit.signal,
                    "clone failed"
                );
                summary.clone_failures += 1;
                false
            }
            Err(error) => {
                tracing::warn!(repo = %full_name, %error, "clone could not start");
                summary.clone_failures += 1;
                false
            }
        }
    }

    async fn install(
        &self,
        key: &str,
        projects: &mut ProjectLedger,
        summary: &mut InstallSummary,
    ) -> Result<(), PipelineError> {
        let Some(record) = projects.get(key) else {
            return Ok(());
        };
        let dir = layout::project_dir(&self.config.clone_dir, record);
        if !record.has_package_json {
            tracing::debug!(%key, "no package.json, nothing to install");
            summary.install_skipped += 1;
            return Ok(());
        }
        if dir.join("node_modules").exists() {
            tracing::debug!(%key, "dependencies already installed");
            summary.install_skipped += 1;
            return Ok(());
        }

        let tag = record.full_name.clone();
        let start = Utc::now();
        tracing::info!(%key, "installing dependencies");
        let spec = CommandSpec::new(&self.config.package_manager, &dir).arg("install");
        let exit = match run_logged(&spec, &tag).await {
            Ok(exit) => exit,
            Err(error) => {
                tracing::warn!(%key, %error, "install could not start");
                ExitInfo::default()
            }
        };

        if exit.success() {
            summary.installed += 1;
        } else {
            tracing::warn!(%key, code = ?exit.code, signal = ?exit.signal, "install failed");
            summary.install_failures += 1;
        }
        if let Some(record) = projects.get_mut(key) {
            record.install = Some(InstallRun {
                start,
                exit_code: exit.code,
                exit_signal: exit.signal,
            });
        }
        projects.save()?;
        Ok(())
    }
}
