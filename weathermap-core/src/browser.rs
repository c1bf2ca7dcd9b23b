use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context, Result};
use tracing::info;

/// Command that hands `target` to the platform's default browser.
fn opener_command(target: &OsStr) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(target);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(target);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        cmd
    }
}

/// Open the document at `path` in a browser without waiting for it.
pub fn open(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Map document not found: {}", path.display());
    }

    let mut cmd = opener_command(path.as_os_str());
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    cmd.spawn()
        .with_context(|| format!("Failed to launch browser for {}", path.display()))?;

    info!(path = %path.display(), "browser launched");
    Ok(())
}
