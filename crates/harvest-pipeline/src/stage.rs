//! Build pipeline stage: run one build-tool step across registered projects.
//!
//! Projects are visited in ledger order. For each one the runner decides
//! whether the stage may run at all (ignored, ineligible, already done), then
//! resets the stage's record, spawns the tool in the project directory, and
//! appends every output chunk to the record as it arrives. The ledger is
//! rewritten after each chunk, so an interrupted run leaves its partial
//! output behind.

use chrono::Utc;
use harvest_config::PipelineConfig;
use harvest_core::entities::{ProjectRecord, StageRun};
use harvest_core::enums::Stage;
use harvest_core::outcome::{classify_test_output, stage_status};
use harvest_ledger::ProjectLedger;
use harvest_parser::PragmaCache;
use serde::Serialize;

use crate::error::PipelineError;
use crate::layout;
use crate::process::{CommandSpec, ExitInfo, OutputEvent, run_streaming};
use crate::solc::discover_version;
use crate::truffle_config::{self, NetworkPin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOptions {
    /// Ledger position of the first project to visit.
    pub start_index: usize,
    /// Visit every project from `start_index` on, not just that one.
    pub continue_to_next: bool,
    /// Skip projects whose previous run of this stage succeeded.
    pub dont_rerun_if_succeeded: bool,
    /// Stage that must have exited zero first.
    pub precondition: Option<Stage>,
    /// Compile only: use this compiler version instead of discovering one.
    pub forced_solc_version: Option<String>,
    /// Only revisit projects whose previous run of this stage failed.
    pub only_failed: bool,
}

impl StageOptions {
    /// Every project, default precondition, nothing skipped.
    #[must_use]
    pub const fn for_stage(stage: Stage) -> Self {
        Self {
            start_index: 0,
            continue_to_next: true,
            dont_rerun_if_succeeded: false,
            precondition: stage.default_precondition(),
            forced_solc_version: None,
            only_failed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub visited: usize,
    pub ran: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Not run because of how the previous run of this stage went.
    pub skipped_prior: usize,
    pub ineligible: usize,
    pub ignored: usize,
    /// Single-project mode: the full record of a failed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspect: Option<ProjectRecord>,
}

impl StageSummary {
    const fn new(stage: Stage) -> Self {
        Self {
            stage,
            visited: 0,
            ran: 0,
            succeeded: 0,
            failed: 0,
            skipped_prior: 0,
            ineligible: 0,
            ignored: 0,
            inspect: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Ignored,
    Ineligible,
    SkippedPrior,
    Run,
}

pub struct StageRunner {
    config: PipelineConfig,
    pin: NetworkPin,
    pragmas: PragmaCache,
}

impl StageRunner {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let pin = NetworkPin::from_config(&config);
        Self {
            config,
            pin,
            pragmas: PragmaCache::new(),
        }
    }

    /// Run `stage` over the projects selected by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Ledger`] if the project ledger cannot be
    /// saved. Everything that goes wrong inside a single project is recorded
    /// on its entry instead.
    pub async fn run(
        &mut self,
        stage: Stage,
        options: &StageOptions,
        projects: &mut ProjectLedger,
    ) -> Result<StageSummary, PipelineError> {
        let mut summary = StageSummary::new(stage);
        let limit = if options.continue_to_next { usize::MAX } else { 1 };
        let keys: Vec<String> = projects
            .keys()
            .skip(options.start_index)
            .take(limit)
            .map(str::to_owned)
            .collect();

        for key in keys {
            summary.visited += 1;
            let Some(record) = projects.get(&key) else {
                continue;
            };
            match self.disposition(stage, options, record) {
                Disposition::Ignored => {
                    tracing::debug!(%key, %stage, "ignored");
                    summary.ignored += 1;
                }
                Disposition::Ineligible => summary.ineligible += 1,
                Disposition::SkippedPrior => {
                    tracing::debug!(%key, %stage, "skipped on previous outcome");
                    summary.skipped_prior += 1;
                }
                Disposition::Run => {
                    summary.ran += 1;
                    if self.run_project(stage, options, &key, projects).await? {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                        if !options.continue_to_next {
                            summary.inspect = projects.get(&key).cloned();
                        }
                    }
                }
            }
        }

        tracing::info!(
            %stage,
            visited = summary.visited,
            ran = summary.ran,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "stage finished"
        );
        Ok(summary)
    }

    fn disposition(
        &self,
        stage: Stage,
        options: &StageOptions,
        record: &ProjectRecord,
    ) -> Disposition {
        if record.ignore {
            return Disposition::Ignored;
        }
        let dir = layout::project_dir(&self.config.clone_dir, record);
        if !dir.is_dir() || record.has_test_dir != Some(true) {
            return Disposition::Ineligible;
        }
        if let Some(precondition) = options.precondition
            && record.exit_code(precondition) != Some(0)
        {
            return Disposition::Ineligible;
        }

        let status = stage_status(record, stage, self.config.zero_tests_policy);
        if options.only_failed && status != Some(false) {
            return Disposition::SkippedPrior;
        }
        if options.dont_rerun_if_succeeded && status == Some(true) {
            return Disposition::SkippedPrior;
        }
        Disposition::Run
    }

    /// Run the stage for one project; `true` if it succeeded.
    async fn run_project(
        &mut self,
        stage: Stage,
        options: &StageOptions,
        key: &str,
        projects: &mut ProjectLedger,
    ) -> Result<bool, PipelineError> {
        if stage == Stage::Compile {
            self.prepare_compile(key, options, projects);
        }

        tokio::time::sleep(self.config.settle_delay()).await;

        let record = projects
            .get_mut(key)
            .ok_or_else(|| PipelineError::UnknownProject(key.to_owned()))?;
        let spec = self.command(stage, record);
        *record.stage_run_mut(stage) = Some(StageRun::started(Utc::now()));
        projects.save()?;
        tracing::info!(%key, %stage, command = %spec.display(), "stage started");

        let result = run_streaming(&spec, |event| {
            if let Some(run) = current_run(projects, key, stage) {
                match event {
                    OutputEvent::Stdout(text) => run.std_out_events.push(text),
                    OutputEvent::Stderr(text) => run.std_error_events.push(text),
                    OutputEvent::ReadError(error) => run.errors.push(error),
                }
            }
            projects.save()?;
            Ok(())
        })
        .await;

        let exit = match result {
            Ok(exit) => Some(exit),
            Err(error @ PipelineError::Spawn { .. }) => {
                tracing::warn!(%key, %stage, %error, "stage could not start");
                if let Some(run) = current_run(projects, key, stage) {
                    run.errors.push(error.to_string());
                }
                None
            }
            Err(error) => return Err(error),
        };

        if let Some(run) = current_run(projects, key, stage) {
            run.finish = Some(Utc::now());
            let ExitInfo { code, signal } = exit.unwrap_or_default();
            run.exit_code = code;
            run.exit_signal = signal;
        }
        projects.save()?;

        let Some(record) = projects.get(key) else {
            return Ok(false);
        };
        let succeeded = stage_status(record, stage, self.config.zero_tests_policy) == Some(true);
        let run = record.stage_run(stage);
        let code = run.and_then(|r| r.exit_code);
        let signal = run.and_then(|r| r.exit_signal);
        if stage == Stage::Test {
            let outcome = classify_test_output(
                run.map_or(&[][..], |r| r.std_out_events.as_slice()),
                self.config.zero_tests_policy,
            );
            if succeeded {
                tracing::info!(%key, %stage, ?code, ?outcome, "tests executed");
            } else {
                tracing::warn!(%key, %stage, ?code, ?signal, ?outcome, "tests not executed");
            }
        } else if succeeded {
            tracing::info!(%key, %stage, "stage succeeded");
        } else {
            tracing::warn!(%key, %stage, ?code, ?signal, "stage failed");
        }
        Ok(succeeded)
    }

    /// Pin the network and compiler in the project's build config, and
    /// remember the compiler version on the record.
    fn prepare_compile(&mut self, key: &str, options: &StageOptions, projects: &mut ProjectLedger) {
        let Some(record) = projects.get_mut(key) else {
            return;
        };
        let dir = layout::project_dir(&self.config.clone_dir, record);
        let version = options
            .forced_solc_version
            .clone()
            .or_else(|| record.solc_version.clone())
            .or_else(|| discover_version(&dir, &mut self.pragmas));

        let config_path = layout::config_path(&self.config.clone_dir, record);
        if let Err(error) = truffle_config::apply(&config_path, &self.pin, version.as_deref()) {
            tracing::warn!(%key, %error, "could not patch build config");
        }
        if version.is_some() {
            record.solc_version = version;
        }
    }

    fn command(&self, stage: Stage, record: &ProjectRecord) -> CommandSpec {
        let dir = layout::project_dir(&self.config.clone_dir, record);
        if stage == Stage::Test && record.has_test_script {
            CommandSpec::new(&self.config.package_manager, dir)
                .arg("run")
                .arg("test")
        } else {
            CommandSpec::new(&self.config.build_tool, dir).arg(stage.as_str())
        }
    }
}

fn current_run<'a>(
    projects: &'a mut ProjectLedger,
    key: &str,
    stage: Stage,
) -> Option<&'a mut StageRun> {
    projects
        .get_mut(key)
        .and_then(|record| record.stage_run_mut(stage).as_mut())
}
