//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// strata - Group-based, exactly-once SQL migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "strata - Group-based, exactly-once SQL migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file, or a directory containing strata.json
    #[arg(short, long, global = true, env = "STRATA_CONFIG", default_value = ".")]
    pub config: PathBuf,

    /// Subcommand to execute (defaults to `update`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply every pending migration in one transaction
    Update,

    /// Show what an update would apply without changing the database
    Status,

    /// List applied migration units
    History(HistoryArgs),

    /// Display version information
    Version,
}

impl Command {
    /// Whether Ctrl-C should cancel the command instead of killing the process.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Update)
    }
}

/// Arguments for the `history` command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only show units of this group
    #[arg(short, long)]
    pub group: Option<String>,
}
