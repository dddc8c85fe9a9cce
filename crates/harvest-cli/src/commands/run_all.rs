use harvest_core::enums::Stage;
use harvest_pipeline::{InstallSummary, Installer, StageOptions, StageRunner, StageSummary};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunAllArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RunAllSummary {
    install: InstallSummary,
    stages: Vec<StageSummary>,
}

/// Handle `harvest run-all`: clone and install, then every build stage in
/// pipeline order over the whole project ledger.
pub async fn handle(
    args: &RunAllArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let repos = ctx.repositories()?;
    let mut projects = ctx.projects()?;

    let install = Installer::new(ctx.config.pipeline.clone())
        .clone_and_install(&repos, &mut projects, 0, true)
        .await?;

    let mut runner = StageRunner::new(ctx.config.pipeline.clone());
    let mut stages = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        let options = StageOptions {
            dont_rerun_if_succeeded: args.skip_succeeded,
            ..StageOptions::for_stage(stage)
        };
        stages.push(runner.run(stage, &options, &mut projects).await?);
    }

    output(&RunAllSummary { install, stages }, flags.format)
}
