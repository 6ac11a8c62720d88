//! Floe CLI - version-ordered schema migrations for ClickHouse.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use floe_cli::cli::{Cli, Command};
use floe_cli::commands;
use floe_cli::error::CliResult;
use floe_cli::output;

#[tokio::main]
async fn main() {
    // Library logs go to stderr; styled command output owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Migrate(args) => commands::migrate::run(args).await,
        Command::Status(args) => commands::status::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
