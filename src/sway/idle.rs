use std::{process::Stdio, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::daemon::events::ActivityEvent;

/// Seconds without input before the user counts as idle.
const IDLE_TIMEOUT_SECONDS: u32 = 120;
/// Pause before respawning swayidle, so a missing binary does not busy-loop.
const RESPAWN_DELAY: Duration = Duration::from_secs(5);

/// Drives a `swayidle` child process and turns its line protocol into
/// [ActivityEvent::IdleChanged] events. Sleep counts as idle: the
/// before-sleep and after-resume hooks emit the same transitions.
pub struct IdleWatcher {
    next: mpsc::Sender<ActivityEvent>,
}

impl IdleWatcher {
    pub fn new(next: mpsc::Sender<ActivityEvent>) -> Self {
        Self { next }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                result = self.watch_once() => match result {
                    Ok(()) => warn!("swayidle exited, respawning"),
                    Err(e) => error!("idle watcher failed, respawning: {e:?}"),
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(RESPAWN_DELAY) => {}
            }
        }
    }

    async fn watch_once(&self) -> Result<()> {
        let timeout = IDLE_TIMEOUT_SECONDS.to_string();
        let mut child = Command::new("swayidle")
            .args([
                "-w",
                "timeout",
                &timeout,
                "echo 1",
                "resume",
                "echo 0",
                "before-sleep",
                "echo 1",
                "after-resume",
                "echo 0",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("spawning swayidle")?;

        let stdout = child
            .stdout
            .take()
            .context("swayidle stdout was not captured")?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            let idle = match line.trim() {
                "1" => true,
                "0" => false,
                other => {
                    warn!("unexpected swayidle output {other:?}");
                    continue;
                }
            };
            self.next.send(ActivityEvent::IdleChanged { idle }).await?;
        }

        child.wait().await?;
        Ok(())
    }
}
