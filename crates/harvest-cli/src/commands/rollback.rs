use harvest_pipeline::truffle_config::rollback_projects;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RollbackArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `harvest rollback`.
pub fn handle(args: &RollbackArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let projects = ctx.projects()?;
    let summary = rollback_projects(&projects, &ctx.config.pipeline.clone_dir, args.failed_only);
    output(&summary, flags.format)
}
