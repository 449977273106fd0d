mod cli;
mod commands;
mod config;
mod error;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Completions { shell } => {
            commands::completions(shell, &mut std::io::stdout());
            Ok(())
        }
        Commands::Doctors => commands::doctors::run(cli.format),
        Commands::Ask(args) => {
            let config = CliConfig::load(cli.config.as_deref());
            commands::ask::run(args, &config, cli.format).await
        }
    }
}

// Logs go to stderr so answers on stdout stay pipeable
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}
