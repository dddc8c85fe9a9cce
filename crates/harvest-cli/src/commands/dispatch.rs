use harvest_core::enums::Stage;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &mut AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Crawl(args) => commands::crawl::handle(&args, ctx, flags).await,
        Commands::Clone(args) => commands::clone::handle(&args, ctx, flags).await,
        Commands::Compile(args) => commands::stage::handle_compile(&args, ctx, flags).await,
        Commands::Migrate(args) => commands::stage::handle(Stage::Migrate, &args, ctx, flags).await,
        Commands::Test(args) => commands::stage::handle(Stage::Test, &args, ctx, flags).await,
        Commands::RunAll(args) => commands::run_all::handle(&args, ctx, flags).await,
        Commands::Rollback(args) => commands::rollback::handle(&args, ctx, flags),
        Commands::Show(args) => commands::show::handle(&args, ctx, flags),
    }
}
