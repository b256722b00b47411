//! rm-triage: files web articles on a reMarkable by reading progress
//!
//! Runs on the tablet itself, either once (the default) or as a daemon
//! polling the local document store. See `rm-triage --help`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rm_triage::cli::{self, Commands};
use rm_triage::Config;

#[derive(Parser)]
#[command(name = "rm-triage")]
#[command(about = "Reading-progress triage for reMarkable web articles")]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "RM_TRIAGE_CONFIG",
        default_value = "/home/root/.rm-triage/config.toml"
    )]
    config: PathBuf,

    /// Document store directory (overrides config file)
    #[arg(short, long, env = "RM_TRIAGE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Reading state file (overrides config file)
    #[arg(long, env = "RM_TRIAGE_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("rm_triage={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or_default();
    info!(config = %cli.config.display(), command = ?command, "Starting rm-triage");

    let mut config = if command.needs_config() {
        Config::load(&cli.config).context("Failed to load configuration")?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(store_dir) = cli.store_dir {
        config.store_dir = store_dir;
    }
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }
    config.validate().context("Invalid configuration")?;

    let output = cli::execute(command, config, &cli.config).await?;
    println!("{}", output);
    Ok(())
}
