//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "irmatch")]
#[command(about = "Check IR rules against per-phase compiler dumps")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check every rule of a manifest against its captured dumps
    Check {
        /// Path to the suite manifest (JSON)
        manifest: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,

        /// Evaluate phase rules on the rayon thread pool
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Override a VM flag from the manifest, as NAME=VALUE (repeatable)
        #[arg(long = "flag", value_name = "NAME=VALUE")]
        flags: Vec<String>,

        /// Optional JSON report output path
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Parse, validate and resolve every rule without reading any dump
    Lint {
        /// Path to the suite manifest (JSON)
        manifest: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,

        /// Override a VM flag from the manifest, as NAME=VALUE (repeatable)
        #[arg(long = "flag", value_name = "NAME=VALUE")]
        flags: Vec<String>,
    },
}
