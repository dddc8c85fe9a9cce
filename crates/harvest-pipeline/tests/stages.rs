//! Build pipeline stages driven through fake build tools.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use harvest_config::PipelineConfig;
use harvest_core::enums::Stage;
use harvest_core::outcome::stage_status;
use harvest_ledger::{ProjectLedger, open_projects};
use harvest_pipeline::layout::inspect_project;
use harvest_pipeline::{StageOptions, StageRunner, StageSummary};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const KEY: &str = "acme/token/truffle.js";

/// Fails compile when a `FAIL_COMPILE` marker sits in the project, and
/// prints a mocha summary for `test`. Every call is appended to `.calls`.
const FAKE_TRUFFLE: &str = r#"#!/bin/sh
echo "truffle $1" >> .calls
case "$1" in
  compile)
    if [ -f FAIL_COMPILE ]; then
      echo "Error: ParserError" >&2
      exit 1
    fi
    echo "Compiling ./contracts/Token.sol..."
    ;;
  migrate)
    echo "Saving artifacts..."
    ;;
  test)
    printf '  Contract: Token\n    \033[32m✓\033[0m mints\n\n  3 passing (2s)\n'
    exit 0
    ;;
esac
"#;

const FAKE_NPM: &str = r#"#!/bin/sh
echo "npm $*" >> .calls
echo "  2 passing (1s)"
"#;

struct Fixture {
    root: TempDir,
    config: PipelineConfig,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let truffle = script(&bin, "truffle", FAKE_TRUFFLE);
        let npm = script(&bin, "npm", FAKE_NPM);

        let config = PipelineConfig {
            data_dir: root.path().join("data"),
            clone_dir: root.path().join("repos"),
            build_tool: truffle.to_string_lossy().into_owned(),
            package_manager: npm.to_string_lossy().into_owned(),
            settle_delay_ms: 0,
            ..PipelineConfig::default()
        };

        let project = config.clone_dir.join("acme/token");
        write(&project.join("truffle.js"), "module.exports = {\n  networks: {}\n};\n");
        write(&project.join("package.json"), r#"{"name": "token"}"#);
        write(&project.join("test/token.js"), "contract('Token', () => {});");
        write(&project.join("contracts/Token.sol"), "pragma solidity ^0.5.0;\ncontract Token {}");

        Self { root, config }
    }

    fn project_dir(&self) -> PathBuf {
        self.config.clone_dir.join("acme/token")
    }

    fn projects(&self) -> ProjectLedger {
        let mut projects = open_projects(self.config.projects_path()).unwrap();
        if !projects.contains_key(KEY) {
            let record =
                inspect_project(&self.config.clone_dir, "acme/token", "truffle.js").unwrap();
            projects.insert(KEY, record);
            projects.save().unwrap();
        }
        projects
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.project_dir().join(".calls"))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    async fn run(
        &self,
        stage: Stage,
        options: &StageOptions,
        projects: &mut ProjectLedger,
    ) -> StageSummary {
        StageRunner::new(self.config.clone())
            .run(stage, options, projects)
            .await
            .unwrap()
    }
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn stage_waits_for_its_precondition() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();

    let summary = fixture
        .run(Stage::Migrate, &StageOptions::for_stage(Stage::Migrate), &mut projects)
        .await;
    assert_eq!(summary.ineligible, 1);
    assert_eq!(summary.ran, 0);
    assert!(projects.get(KEY).unwrap().migrate.is_none());
    assert!(fixture.calls().is_empty());

    for stage in Stage::ALL {
        let summary = fixture
            .run(stage, &StageOptions::for_stage(stage), &mut projects)
            .await;
        assert_eq!(summary.succeeded, 1, "{stage} should succeed");
    }
    assert_eq!(
        fixture.calls(),
        ["truffle compile", "truffle migrate", "truffle test"]
    );

    let record = projects.get(KEY).unwrap();
    assert_eq!(stage_status(record, Stage::Test, Default::default()), Some(true));
}

#[tokio::test]
async fn failed_compile_blocks_migrate_and_keeps_stderr() {
    let fixture = Fixture::new();
    write(&fixture.project_dir().join("FAIL_COMPILE"), "");
    let mut projects = fixture.projects();

    let summary = fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;
    assert_eq!(summary.failed, 1);

    let compile = projects.get(KEY).unwrap().compile.clone().unwrap();
    assert_eq!(compile.exit_code, Some(1));
    assert!(compile.finish.is_some());
    assert_eq!(compile.std_error_events.concat(), "Error: ParserError\n");

    let summary = fixture
        .run(Stage::Migrate, &StageOptions::for_stage(Stage::Migrate), &mut projects)
        .await;
    assert_eq!(summary.ineligible, 1);
    assert!(projects.get(KEY).unwrap().migrate.is_none());
}

#[tokio::test]
async fn output_is_persisted_with_the_record() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;

    let reopened = open_projects(fixture.config.projects_path()).unwrap();
    let compile = reopened.get(KEY).unwrap().compile.clone().unwrap();
    assert_eq!(compile.exit_code, Some(0));
    assert_eq!(
        compile.std_out_events.concat(),
        "Compiling ./contracts/Token.sol...\n"
    );
    assert!(compile.errors.is_empty());
}

#[tokio::test]
async fn compile_patches_config_and_memoizes_version() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;

    assert_eq!(
        projects.get(KEY).unwrap().solc_version.as_deref(),
        Some("0.5.0")
    );
    let config = fs::read_to_string(fixture.project_dir().join("truffle.js")).unwrap();
    assert!(config.contains("version: \"0.5.0\""), "{config}");
    assert_eq!(
        fs::read_to_string(fixture.project_dir().join("truffle.js.bkp")).unwrap(),
        "module.exports = {\n  networks: {}\n};\n"
    );
}

#[tokio::test]
async fn forced_version_wins_over_discovery() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    let options = StageOptions {
        forced_solc_version: Some("0.4.24".into()),
        ..StageOptions::for_stage(Stage::Compile)
    };
    fixture.run(Stage::Compile, &options, &mut projects).await;
    assert_eq!(
        projects.get(KEY).unwrap().solc_version.as_deref(),
        Some("0.4.24")
    );
}

#[tokio::test]
async fn succeeded_stage_is_not_rerun_when_asked() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    let options = StageOptions {
        dont_rerun_if_succeeded: true,
        ..StageOptions::for_stage(Stage::Compile)
    };
    fixture.run(Stage::Compile, &options, &mut projects).await;
    let first = projects.get(KEY).unwrap().compile.clone();

    let summary = fixture.run(Stage::Compile, &options, &mut projects).await;
    assert_eq!(summary.skipped_prior, 1);
    assert_eq!(projects.get(KEY).unwrap().compile, first);
    assert_eq!(fixture.calls(), ["truffle compile"]);
}

#[tokio::test]
async fn only_failed_skips_successes() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;

    let options = StageOptions {
        only_failed: true,
        ..StageOptions::for_stage(Stage::Compile)
    };
    let summary = fixture.run(Stage::Compile, &options, &mut projects).await;
    assert_eq!(summary.skipped_prior, 1);
    assert_eq!(summary.ran, 0);
}

#[tokio::test]
async fn ignored_project_is_never_run() {
    let fixture = Fixture::new();
    let mut projects = fixture.projects();
    projects.get_mut(KEY).unwrap().ignore = true;

    let summary = fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;
    assert_eq!(summary.ignored, 1);
    assert!(fixture.calls().is_empty());
    assert_eq!(stage_status(projects.get(KEY).unwrap(), Stage::Compile, Default::default()), None);
}

#[tokio::test]
async fn test_script_runs_through_package_manager() {
    let fixture = Fixture::new();
    write(
        &fixture.project_dir().join("package.json"),
        r#"{"scripts": {"test": "truffle test --network ganache"}}"#,
    );
    let mut projects = fixture.projects();
    for stage in [Stage::Compile, Stage::Migrate] {
        fixture
            .run(stage, &StageOptions::for_stage(stage), &mut projects)
            .await;
    }
    let summary = fixture
        .run(Stage::Test, &StageOptions::for_stage(Stage::Test), &mut projects)
        .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(fixture.calls().last().map(String::as_str), Some("npm run test"));
}

#[tokio::test]
async fn single_mode_failure_returns_record_for_inspection() {
    let fixture = Fixture::new();
    write(&fixture.project_dir().join("FAIL_COMPILE"), "");
    let mut projects = fixture.projects();
    let options = StageOptions {
        continue_to_next: false,
        ..StageOptions::for_stage(Stage::Compile)
    };

    let summary = fixture.run(Stage::Compile, &options, &mut projects).await;
    let inspect = summary.inspect.unwrap();
    assert_eq!(inspect.key, KEY);
    assert_eq!(inspect.exit_code(Stage::Compile), Some(1));
}

#[tokio::test]
async fn missing_build_tool_is_recorded_not_fatal() {
    let mut fixture = Fixture::new();
    fixture.config.build_tool = fixture
        .root
        .path()
        .join("bin/no-such-tool")
        .to_string_lossy()
        .into_owned();
    let mut projects = fixture.projects();

    let summary = fixture
        .run(Stage::Compile, &StageOptions::for_stage(Stage::Compile), &mut projects)
        .await;
    assert_eq!(summary.failed, 1);
    let compile = projects.get(KEY).unwrap().compile.clone().unwrap();
    assert_eq!(compile.exit_code, None);
    assert_eq!(compile.errors.len(), 1);
    assert!(compile.finish.is_some());
}
