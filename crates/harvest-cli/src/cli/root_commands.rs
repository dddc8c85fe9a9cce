use clap::{Args, Subcommand};
use harvest_core::enums::Stage;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Search GitHub for Solidity repositories and classify them.
    Crawl(CrawlArgs),
    /// Clone qualifying repositories and install their dependencies.
    Clone(CloneArgs),
    /// Run `truffle compile` across registered projects.
    Compile(CompileArgs),
    /// Run `truffle migrate` across projects that compiled.
    Migrate(StageArgs),
    /// Run the test suite of projects that migrated.
    Test(StageArgs),
    /// Clone, then compile, migrate, and test everything.
    #[command(name = "run-all")]
    RunAll(RunAllArgs),
    /// Restore build configs from their backups.
    Rollback(RollbackArgs),
    /// Print one project record with its stage status.
    Show(ShowArgs),
}

/// Arguments for `harvest crawl`.
#[derive(Clone, Debug, Args)]
pub struct CrawlArgs {
    /// Skip repositories with fewer stars (overrides `crawl.star_threshold`).
    #[arg(long)]
    pub stars: Option<u64>,
    /// Repeat the test-directory search for already classified repositories.
    #[arg(long)]
    pub force_tests: bool,
    /// Extra search qualifier; repeat to run several queries.
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

/// Arguments for `harvest clone`.
#[derive(Clone, Debug, Args)]
pub struct CloneArgs {
    /// Position in the qualifying list to start at.
    #[arg(long, default_value_t = 0)]
    pub from: usize,
    /// Process only the repository at `--from`.
    #[arg(long)]
    pub single: bool,
}

/// Arguments shared by the build stages.
#[derive(Clone, Debug, Args)]
pub struct StageArgs {
    /// Position in the project ledger to start at.
    #[arg(long, default_value_t = 0)]
    pub from: usize,
    /// Process only the project at `--from`.
    #[arg(long)]
    pub single: bool,
    /// Leave projects whose last run of this stage succeeded alone.
    #[arg(long)]
    pub skip_succeeded: bool,
    /// Only revisit projects whose last run of this stage failed.
    #[arg(long)]
    pub only_failed: bool,
    /// Require this stage to have exited zero instead of the default one.
    #[arg(long)]
    pub after: Option<Stage>,
}

/// Arguments for `harvest compile`.
#[derive(Clone, Debug, Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub stage: StageArgs,
    /// Compiler version to pin instead of the discovered one.
    #[arg(long)]
    pub solc: Option<String>,
    /// Restore the configs of failed compiles before running.
    #[arg(long)]
    pub rollback_first: bool,
}

/// Arguments for `harvest run-all`.
#[derive(Clone, Debug, Args)]
pub struct RunAllArgs {
    /// Leave stages that already succeeded alone.
    #[arg(long)]
    pub skip_succeeded: bool,
}

/// Arguments for `harvest rollback`.
#[derive(Clone, Debug, Args)]
pub struct RollbackArgs {
    /// Only projects whose last compile failed.
    #[arg(long)]
    pub failed_only: bool,
}

/// Arguments for `harvest show`.
#[derive(Clone, Debug, Args)]
pub struct ShowArgs {
    /// Project key (`owner/name/<config path>`) or ledger position.
    pub project: String,
}
