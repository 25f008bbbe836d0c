use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mdqdaemon::Orchestrator;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdqueue", version, about = "Dynamic queue daemon for MPD")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dynamic-queue daemon
    Daemon {
        /// Path to the config file
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        std::process::exit(1);
    };

    match command {
        Command::Daemon { config } => run_daemon(config),
    }
}

fn run_daemon(config: PathBuf) -> Result<()> {
    info!(config_file = %config.display(), "Starting mdqueue daemon");

    // All monitors are cooperative tasks multiplexed on one thread; the
    // shared playlist cache relies on that.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        Orchestrator::new(config)?.run().await?;
        Ok(())
    })
}
