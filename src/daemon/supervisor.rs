//! Starts and stops the inference daemon.

use crate::config::DaemonConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Process seam used by the supervisor.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start a program in the background without waiting for it.
    async fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()>;

    /// Run a program to completion and report whether it succeeded.
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<bool>;
}

/// Launches real OS processes.
pub struct SystemLauncher;

#[async_trait]
impl Launcher for SystemLauncher {
    async fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()> {
        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Keep the terminal's SIGINT away from the daemon.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn()?;
        debug!("Spawned {} (PID {})", program, child.id());
        Ok(())
    }

    async fn run(&self, program: &str, args: &[&str]) -> io::Result<bool> {
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }
}

/// Makes the daemon reachable before a request and stops it afterwards.
pub struct Supervisor<L> {
    launcher: L,
    program: String,
    kill_program: String,
    model: String,
    warmup: Duration,
}

impl<L: Launcher> Supervisor<L> {
    pub fn new(launcher: L, config: &DaemonConfig, model: impl Into<String>) -> Self {
        Self {
            launcher,
            program: config.program.clone(),
            kill_program: config.kill_program.clone(),
            model: model.into(),
            warmup: config.warmup(),
        }
    }

    /// Start `<program> serve` and wait out the warm-up interval.
    ///
    /// An instance that is already running makes the new one exit on its
    /// own, so both cases look the same from here. Readiness is not probed;
    /// a daemon that never came up shows as a transport error later.
    pub async fn ensure_running(&self) -> Result<()> {
        info!("Starting {} serve", self.program);
        self.launcher
            .spawn(&self.program, &["serve"])
            .await
            .map_err(|source| Error::Spawn {
                command: format!("{} serve", self.program),
                source,
            })?;

        if !self.warmup.is_zero() {
            debug!("Waiting {:?} for the daemon to warm up", self.warmup);
            tokio::time::sleep(self.warmup).await;
        }
        Ok(())
    }

    /// Unload the model, then kill the daemon by name. Never fails.
    pub async fn shutdown(&self) {
        self.best_effort(&self.program, &["stop", self.model.as_str()]).await;
        self.best_effort(&self.kill_program, &[self.program.as_str()]).await;
    }

    async fn best_effort(&self, program: &str, args: &[&str]) {
        let command = format!("{} {}", program, args.join(" "));
        match self.launcher.run(program, args).await {
            Ok(true) => debug!("'{}' succeeded", command),
            Ok(false) => warn!("'{}' exited with a failure status", command),
            Err(e) => warn!("Failed to run '{}': {}", command, e),
        }
    }
}
