//! strata CLI - Command-line runner for group-based SQL migrations.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::{logging, output};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Update);

    // Ctrl-C cancels an update and rolls back its open batch. Other commands
    // keep the default handler so Ctrl-C still terminates them.
    let cancel = CancellationToken::new();
    if command.is_cancellable() {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });
    }

    match command {
        Command::Update => commands::update::run(&cli.config, cancel).await,
        Command::Status => commands::status::run(&cli.config).await,
        Command::History(args) => commands::history::run(&cli.config, args).await,
        Command::Version => commands::version::run().await,
    }
}
