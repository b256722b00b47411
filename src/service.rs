//! systemd service installation

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

pub const UNIT_NAME: &str = "rm-triage.service";
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// Unit file that runs the daemon with the given config
pub fn render_unit(exe: &Path, config: &Path) -> String {
    format!(
        "[Unit]
Description=reMarkable article triage
After=multi-user.target

[Service]
Type=simple
ExecStart={exe} --config {config} daemon
Restart=always
RestartSec=10
User=root
Group=root
WorkingDirectory=/home/root

[Install]
WantedBy=multi-user.target
",
        exe = exe.display(),
        config = config.display(),
    )
}

/// Write the unit file into `unit_dir`, returning its path
pub fn write_unit(unit_dir: &Path, exe: &Path, config: &Path) -> Result<PathBuf> {
    let path = unit_dir.join(UNIT_NAME);
    std::fs::write(&path, render_unit(exe, config))
        .with_context(|| format!("Failed to write {} (root privileges required?)", path.display()))?;
    info!(path = %path.display(), "Wrote service unit");
    Ok(path)
}

/// Install the unit for the running binary, then reload and enable it
pub fn install(config: &Path) -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let config = if config.is_absolute() {
        config.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to resolve config path")?
            .join(config)
    };

    let path = write_unit(Path::new(SYSTEMD_UNIT_DIR), &exe, &config)?;
    systemctl(&["daemon-reload"])?;
    systemctl(&["enable", UNIT_NAME])?;

    info!(unit = UNIT_NAME, "Service installed and enabled");
    Ok(path)
}

fn systemctl(args: &[&str]) -> Result<()> {
    let status = Command::new("systemctl")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run systemctl {}", args.join(" ")))?;

    if !status.success() {
        warn!(args = ?args, status = %status, "systemctl failed");
        bail!("systemctl {} exited with {}", args.join(" "), status);
    }
    Ok(())
}
