//! CLI commands - one-shot runs, the daemon, and setup helpers

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::daemon::PollLoop;
use crate::store::XochitlStore;
use crate::triage::{ObservationStore, TriageController};

#[derive(Debug, Clone, Default, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run a single triage pass and print its report
    #[default]
    Once,

    /// Run a pass every poll_interval seconds until interrupted
    Daemon,

    /// Show every article's location and reading analysis without moving anything
    Analyze,

    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Install and enable the systemd unit
    InstallService,
}

impl Commands {
    /// Whether the command operates on the loaded configuration
    pub fn needs_config(&self) -> bool {
        matches!(self, Commands::Once | Commands::Daemon | Commands::Analyze)
    }
}

/// Execute a command; the returned text goes to stdout
pub async fn execute(command: Commands, config: Config, config_path: &Path) -> Result<String> {
    match command {
        Commands::Once => {
            let mut controller = build_controller(config);
            let report = controller.run_pass().context("Triage pass failed")?;
            Ok(serde_json::to_string_pretty(&report)?)
        }

        Commands::Daemon => {
            let mut poll = PollLoop::new(build_controller(config));
            tokio::spawn(forward_shutdown_signals(poll.shutdown_handle()));
            let stats = poll.run().await;
            Ok(format!(
                "Daemon stopped after {} passes ({} failed)",
                stats.passes, stats.failed_passes
            ))
        }

        Commands::Analyze => {
            let controller = build_controller(config);
            let reports = controller
                .analyze_all(crate::now_millis())
                .context("Analysis failed")?;
            Ok(serde_json::to_string_pretty(&reports)?)
        }

        Commands::InitConfig { force } => {
            init_config(&config, config_path, force)?;
            Ok(format!("Wrote {}", config_path.display()))
        }

        Commands::InstallService => {
            let unit = crate::service::install(config_path)?;
            Ok(format!(
                "Installed {}\nStart with: systemctl start {}",
                unit.display(),
                crate::service::UNIT_NAME
            ))
        }
    }
}

fn build_controller(config: Config) -> TriageController<XochitlStore> {
    info!(
        store_dir = %config.store_dir.display(),
        state_file = %config.state_file.display(),
        "Opening document store"
    );
    let store = XochitlStore::new(&config.store_dir);
    let observations = ObservationStore::open(&config.state_file);
    TriageController::new(store, config, observations)
}

/// Write `config` as TOML, refusing to replace an existing file unless forced
pub fn init_config(config: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

/// Send one shutdown request on SIGINT or SIGTERM
async fn forward_shutdown_signals(shutdown: mpsc::Sender<()>) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received interrupt"),
        _ = terminate => info!("Received SIGTERM"),
    }

    let _ = shutdown.send(()).await;
}
