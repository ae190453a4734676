//! Platform helpers for spawning and stopping external tools

use std::ffi::OsStr;
use tokio::process::{Child, Command};

pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    // No console window per spawned tool
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

/// Ask a running child to exit. On unix this sends SIGTERM so the tool can
/// clean up its partial files; elsewhere the process is terminated.
#[cfg(unix)]
pub async fn terminate(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        // already reaped
        return Ok(());
    };

    tracing::debug!(pid, "sending SIGTERM");
    let status = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "kill -TERM {} exited with {}",
            pid, status
        )))
    }
}

#[cfg(not(unix))]
pub async fn terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
