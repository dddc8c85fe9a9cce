use harvest_pipeline::Installer;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CloneArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `harvest clone`.
pub async fn handle(
    args: &CloneArgs,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let repos = ctx.repositories()?;
    let mut projects = ctx.projects()?;
    let summary = Installer::new(ctx.config.pipeline.clone())
        .clone_and_install(&repos, &mut projects, args.from, !args.single)
        .await?;
    output(&summary, flags.format)
}
