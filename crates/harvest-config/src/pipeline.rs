//! Clone, install, and build-stage settings.

use std::path::PathBuf;
use std::time::Duration;

use harvest_core::enums::ZeroTestsPolicy;
use serde::{Deserialize, Serialize};

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from("repos")
}

fn default_repositories_file() -> String {
    String::from("repositories.json")
}

fn default_projects_file() -> String {
    String::from("projects.json")
}

fn default_git() -> String {
    String::from("git")
}

fn default_package_manager() -> String {
    String::from("npm")
}

fn default_build_tool() -> String {
    String::from("truffle")
}

const fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_network_host() -> String {
    String::from("127.0.0.1")
}

const fn default_network_port() -> u16 {
    8545
}

fn default_solc_version() -> String {
    String::from("0.5.10")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Directory holding both ledger files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Clones land at `<clone_dir>/<owner>/<name>`.
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,

    #[serde(default = "default_repositories_file")]
    pub repositories_file: String,

    #[serde(default = "default_projects_file")]
    pub projects_file: String,

    /// Executables. Bare names are resolved through `PATH`.
    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    #[serde(default = "default_build_tool")]
    pub build_tool: String,

    /// Pause before spawning each stage process.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Development network pinned into every patched build config.
    #[serde(default = "default_network_host")]
    pub network_host: String,

    #[serde(default = "default_network_port")]
    pub network_port: u16,

    /// Compiler version written into configs that have no contracts to
    /// discover one from.
    #[serde(default = "default_solc_version")]
    pub default_solc_version: String,

    #[serde(default)]
    pub zero_tests_policy: ZeroTestsPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            clone_dir: default_clone_dir(),
            repositories_file: default_repositories_file(),
            projects_file: default_projects_file(),
            git: default_git(),
            package_manager: default_package_manager(),
            build_tool: default_build_tool(),
            settle_delay_ms: default_settle_delay_ms(),
            network_host: default_network_host(),
            network_port: default_network_port(),
            default_solc_version: default_solc_version(),
            zero_tests_policy: ZeroTestsPolicy::default(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn repositories_path(&self) -> PathBuf {
        self.data_dir.join(&self.repositories_file)
    }

    #[must_use]
    pub fn projects_path(&self) -> PathBuf {
        self.data_dir.join(&self.projects_file)
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
