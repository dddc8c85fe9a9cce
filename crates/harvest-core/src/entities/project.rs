use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Stage;

/// One execution of a pipeline stage.
///
/// Replaced wholesale each time the stage is re-run; only the latest run is
/// kept. Output chunks are stored verbatim as they arrived from the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageRun {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub finish: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub exit_signal: Option<i32>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub std_out_events: Vec<String>,
    #[serde(default)]
    pub std_error_events: Vec<String>,
}

impl StageRun {
    /// A run that has just started.
    #[must_use]
    pub const fn started(start: DateTime<Utc>) -> Self {
        Self {
            start,
            finish: None,
            exit_code: None,
            exit_signal: None,
            errors: Vec::new(),
            std_out_events: Vec::new(),
            std_error_events: Vec::new(),
        }
    }

    /// The process exited on its own with code zero.
    #[must_use]
    pub const fn exited_cleanly(&self) -> bool {
        matches!(self.exit_code, Some(0)) && self.exit_signal.is_none()
    }

    /// The process has exited (successfully or not).
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finish.is_some()
    }
}

/// Result of the dependency install for a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallRun {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub exit_signal: Option<i32>,
}

/// A buildable Truffle project, keyed by `{full_name}/{config_path}`.
///
/// A repository may contain several of these, one per build-config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub key: String,
    pub full_name: String,
    /// Build-config path relative to the repository root.
    pub path: String,
    pub has_package_json: bool,
    #[serde(default)]
    pub has_test_dir: Option<bool>,
    #[serde(default)]
    pub has_test_script: bool,
    #[serde(default)]
    pub solc_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<StageRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate: Option<StageRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<StageRun>,
    /// Manual override: skip this project in every stage.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore: bool,
}

impl ProjectRecord {
    /// Ledger key for a build-config file inside a repository.
    #[must_use]
    pub fn key_for(full_name: &str, config_path: &str) -> String {
        format!("{full_name}/{config_path}")
    }

    /// Directory holding the build-config file, relative to the clone root.
    #[must_use]
    pub fn project_dir(&self) -> &str {
        self.key.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    #[must_use]
    pub const fn stage_run(&self, stage: Stage) -> Option<&StageRun> {
        match stage {
            Stage::Compile => self.compile.as_ref(),
            Stage::Migrate => self.migrate.as_ref(),
            Stage::Test => self.test.as_ref(),
        }
    }

    pub const fn stage_run_mut(&mut self, stage: Stage) -> &mut Option<StageRun> {
        match stage {
            Stage::Compile => &mut self.compile,
            Stage::Migrate => &mut self.migrate,
            Stage::Test => &mut self.test,
        }
    }

    /// Recorded exit code of the latest run of `stage`.
    #[must_use]
    pub fn exit_code(&self, stage: Stage) -> Option<i32> {
        self.stage_run(stage).and_then(|run| run.exit_code)
    }
}
