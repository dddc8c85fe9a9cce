use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod context;
mod logging;
mod output;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("harvest error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let flags = cli.global_flags();

    let config = bootstrap::load_config(&flags)?;
    let log_guard = logging::init(&config.general.log_dir, flags.quiet, flags.verbose)?;
    tracing::debug!(log = %log_guard.log_path.display(), "logging to file");
    context::warn_unconfigured(&config);

    let mut ctx = context::AppContext::new(config);
    let result = commands::dispatch::dispatch(cli.command, &mut ctx, &flags).await;
    if let Err(error) = &result {
        tracing::error!(error = format!("{error:#}"), "command failed");
    }
    drop(log_guard);
    result
}
