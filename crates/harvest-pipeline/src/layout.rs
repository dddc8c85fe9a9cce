//! Where things live on disk, and project registration from a clone.
//!
//! A clone of `owner/name` lives at `<clone_dir>/owner/name`. A project's key
//! is `owner/name/<config path>`, so the config file itself is
//! `<clone_dir>/<key>` and the project directory is its parent.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use harvest_core::entities::{ProjectRecord, RepositoryRecord};
use harvest_ledger::{ProjectLedger, RepositoryLedger, qualifying};
use serde::Deserialize;

use crate::error::PipelineError;

/// npm writes this as the `test` script of a freshly initialized package.
const NPM_PLACEHOLDER_TEST: &str = "no test specified";

#[must_use]
pub fn repo_dir(clone_dir: &Path, full_name: &str) -> PathBuf {
    clone_dir.join(full_name)
}

#[must_use]
pub fn project_dir(clone_dir: &Path, record: &ProjectRecord) -> PathBuf {
    clone_dir.join(record.project_dir())
}

#[must_use]
pub fn config_path(clone_dir: &Path, record: &ProjectRecord) -> PathBuf {
    clone_dir.join(&record.key)
}

/// `test/` exists, is a directory, and holds something besides `.gitkeep`.
#[must_use]
pub fn has_usable_test_dir(project_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(project_dir.join("test")) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .any(|entry| entry.file_name() != ".gitkeep")
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: std::collections::HashMap<String, String>,
}

/// `package.json` declares a real `test` script.
#[must_use]
pub fn has_test_script(project_dir: &Path) -> bool {
    let Ok(text) = fs::read_to_string(project_dir.join("package.json")) else {
        return false;
    };
    match serde_json::from_str::<PackageManifest>(&text) {
        Ok(manifest) => manifest
            .scripts
            .get("test")
            .is_some_and(|script| {
                !script.trim().is_empty() && !script.contains(NPM_PLACEHOLDER_TEST)
            }),
        Err(error) => {
            tracing::debug!(dir = %project_dir.display(), %error, "unreadable package.json");
            false
        }
    }
}

/// Build a record for the build config at `config_path` inside the clone of
/// `full_name`, or `None` if its directory is not on disk.
#[must_use]
pub fn inspect_project(
    clone_dir: &Path,
    full_name: &str,
    config_path: &str,
) -> Option<ProjectRecord> {
    let key = ProjectRecord::key_for(full_name, config_path);
    let dir = match Path::new(&key).parent() {
        Some(parent) => clone_dir.join(parent),
        None => clone_dir.to_path_buf(),
    };
    let metadata = fs::metadata(&dir).ok().filter(fs::Metadata::is_dir)?;

    Some(ProjectRecord {
        key,
        full_name: full_name.to_owned(),
        path: config_path.to_owned(),
        has_package_json: dir.join("package.json").is_file(),
        has_test_dir: Some(has_usable_test_dir(&dir)),
        has_test_script: has_test_script(&dir),
        solc_version: None,
        repo_date: metadata.modified().ok().map(DateTime::<Utc>::from),
        install: None,
        compile: None,
        migrate: None,
        test: None,
        ignore: false,
    })
}

/// Add a record for every build config of `repo` whose directory exists and
/// that is not registered yet. Existing records are left untouched.
///
/// Returns the keys of all of `repo`'s projects present in the ledger.
pub fn register_repository(
    projects: &mut ProjectLedger,
    clone_dir: &Path,
    repo: &RepositoryRecord,
) -> Vec<String> {
    let mut keys = Vec::new();
    for entry in repo.build_configs() {
        let key = ProjectRecord::key_for(repo.full_name(), &entry.path);
        if !projects.contains_key(&key) {
            let Some(record) = inspect_project(clone_dir, repo.full_name(), &entry.path) else {
                tracing::debug!(%key, "project directory missing, not registered");
                continue;
            };
            tracing::info!(
                %key,
                has_test_dir = ?record.has_test_dir,
                has_package_json = record.has_package_json,
                "project registered"
            );
            projects.insert(key.clone(), record);
        }
        keys.push(key);
    }
    keys
}

/// Register projects of every qualifying repository, then persist.
///
/// # Errors
///
/// Returns [`PipelineError::Ledger`] if the project ledger cannot be saved.
pub fn register_all(
    repos: &RepositoryLedger,
    projects: &mut ProjectLedger,
    clone_dir: &Path,
) -> Result<usize, PipelineError> {
    let before = projects.len();
    for repo in qualifying(repos) {
        register_repository(projects, clone_dir, repo);
    }
    let added = projects.len() - before;
    if added > 0 {
        projects.save()?;
    }
    Ok(added)
}
