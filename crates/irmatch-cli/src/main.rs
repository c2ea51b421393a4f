mod cli;
mod commands;
mod manifest;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            manifest,
            format,
            parallel,
            flags,
            out,
        } => {
            commands::check::run_check_command(&manifest, &format, parallel, &flags, out.as_ref())?;
        }
        Commands::Lint {
            manifest,
            format,
            flags,
        } => {
            commands::lint::run_lint_command(&manifest, &format, &flags)?;
        }
    }

    Ok(())
}
