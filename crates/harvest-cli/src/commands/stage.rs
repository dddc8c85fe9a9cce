use harvest_core::enums::Stage;
use harvest_pipeline::layout::register_all;
use harvest_pipeline::truffle_config::rollback_projects;
use harvest_pipeline::{StageOptions, StageRunner};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{CompileArgs, StageArgs};
use crate::context::AppContext;
use crate::output::output;

/// Handle `harvest migrate` and `harvest test`.
pub async fn handle(
    stage: Stage,
    args: &StageArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    run(stage, stage_options(stage, args, None), ctx, flags).await
}

/// Handle `harvest compile`.
pub async fn handle_compile(
    args: &CompileArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if args.rollback_first {
        let projects = ctx.projects()?;
        let rolled_back = rollback_projects(&projects, &ctx.config.pipeline.clone_dir, true);
        tracing::info!(
            restored = rolled_back.restored,
            without_backup = rolled_back.without_backup,
            failed = rolled_back.failed,
            "rolled back failed compiles"
        );
    }
    let options = stage_options(Stage::Compile, &args.stage, args.solc.clone());
    run(Stage::Compile, options, ctx, flags).await
}

async fn run(
    stage: Stage,
    options: StageOptions,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let repos = ctx.repositories()?;
    let mut projects = ctx.projects()?;
    let added = register_all(&repos, &mut projects, &ctx.config.pipeline.clone_dir)?;
    if added > 0 {
        tracing::info!(added, "registered new projects");
    }

    let summary = StageRunner::new(ctx.config.pipeline.clone())
        .run(stage, &options, &mut projects)
        .await?;
    output(&summary, flags.format)
}

fn stage_options(stage: Stage, args: &StageArgs, solc: Option<String>) -> StageOptions {
    StageOptions {
        start_index: args.from,
        continue_to_next: !args.single,
        dont_rerun_if_succeeded: args.skip_succeeded,
        precondition: args.after.or_else(|| stage.default_precondition()),
        forced_solc_version: solc,
        only_failed: args.only_failed,
    }
}
